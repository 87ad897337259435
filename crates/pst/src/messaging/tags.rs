//! Property ids of the MAPI properties this crate reads, and their canonical names.
//!
//! See [MS-OXPROPS](https://learn.microsoft.com/en-us/openspecs/exchange_server_protocols/ms-oxprops/f6ab1613-aefe-447d-a49c-18217230b148).

pub const PID_TAG_MESSAGE_CLASS: u16 = 0x001A;
pub const PID_TAG_SUBJECT: u16 = 0x0037;
pub const PID_TAG_CLIENT_SUBMIT_TIME: u16 = 0x0039;
pub const PID_TAG_SENT_REPRESENTING_NAME: u16 = 0x0042;
pub const PID_TAG_SENT_REPRESENTING_EMAIL_ADDRESS: u16 = 0x0065;
pub const PID_TAG_TRANSPORT_MESSAGE_HEADERS: u16 = 0x007D;
pub const PID_TAG_RECIPIENT_TYPE: u16 = 0x0C15;
pub const PID_TAG_SENDER_NAME: u16 = 0x0C1A;
pub const PID_TAG_SENDER_EMAIL_ADDRESS: u16 = 0x0C1F;
pub const PID_TAG_DISPLAY_BCC: u16 = 0x0E02;
pub const PID_TAG_DISPLAY_CC: u16 = 0x0E03;
pub const PID_TAG_DISPLAY_TO: u16 = 0x0E04;
pub const PID_TAG_MESSAGE_DELIVERY_TIME: u16 = 0x0E06;
pub const PID_TAG_MESSAGE_FLAGS: u16 = 0x0E07;
pub const PID_TAG_MESSAGE_SIZE: u16 = 0x0E08;
pub const PID_TAG_HAS_ATTACHMENTS: u16 = 0x0E1B;
pub const PID_TAG_ATTACH_SIZE: u16 = 0x0E20;
pub const PID_TAG_ATTACH_NUMBER: u16 = 0x0E21;
pub const PID_TAG_RECORD_KEY: u16 = 0x0FF9;
pub const PID_TAG_BODY: u16 = 0x1000;
pub const PID_TAG_RTF_COMPRESSED: u16 = 0x1009;
pub const PID_TAG_BODY_HTML: u16 = 0x1013;
pub const PID_TAG_DISPLAY_NAME: u16 = 0x3001;
pub const PID_TAG_ADDRESS_TYPE: u16 = 0x3002;
pub const PID_TAG_EMAIL_ADDRESS: u16 = 0x3003;
pub const PID_TAG_CREATION_TIME: u16 = 0x3007;
pub const PID_TAG_IPM_SUB_TREE_ENTRY_ID: u16 = 0x35E0;
pub const PID_TAG_CONTENT_COUNT: u16 = 0x3602;
pub const PID_TAG_CONTENT_UNREAD_COUNT: u16 = 0x3603;
pub const PID_TAG_SUBFOLDERS: u16 = 0x360A;
pub const PID_TAG_CONTAINER_CLASS: u16 = 0x3613;
/// Shared by `PidTagAttachDataBinary` and `PidTagAttachDataObject`.
pub const PID_TAG_ATTACH_DATA: u16 = 0x3701;
pub const PID_TAG_ATTACH_EXTENSION: u16 = 0x3703;
pub const PID_TAG_ATTACH_FILENAME: u16 = 0x3704;
pub const PID_TAG_ATTACH_METHOD: u16 = 0x3705;
pub const PID_TAG_ATTACH_LONG_FILENAME: u16 = 0x3707;
pub const PID_TAG_RENDERING_POSITION: u16 = 0x370B;
pub const PID_TAG_ATTACH_MIME_TAG: u16 = 0x370E;
pub const PID_TAG_ATTACH_CONTENT_ID: u16 = 0x3712;
pub const PID_TAG_ATTACH_FLAGS: u16 = 0x3714;
pub const PID_TAG_SMTP_ADDRESS: u16 = 0x39FE;
pub const PID_TAG_INTERNET_CODEPAGE: u16 = 0x3FDE;
pub const PID_TAG_MESSAGE_CODEPAGE: u16 = 0x3FFD;
pub const PID_TAG_SENDER_SMTP_ADDRESS: u16 = 0x5D01;
pub const PID_TAG_SENT_REPRESENTING_SMTP_ADDRESS: u16 = 0x5D02;
pub const PID_TAG_LTP_ROW_ID: u16 = 0x67F2;
pub const PID_TAG_LTP_ROW_VERSION: u16 = 0x67F3;
pub const PID_TAG_ATTACHMENT_HIDDEN: u16 = 0x7FFE;

const KNOWN_TAGS: &[(u16, &str)] = &[
    (PID_TAG_MESSAGE_CLASS, "PidTagMessageClass"),
    (PID_TAG_SUBJECT, "PidTagSubject"),
    (PID_TAG_CLIENT_SUBMIT_TIME, "PidTagClientSubmitTime"),
    (PID_TAG_SENT_REPRESENTING_NAME, "PidTagSentRepresentingName"),
    (
        PID_TAG_SENT_REPRESENTING_EMAIL_ADDRESS,
        "PidTagSentRepresentingEmailAddress",
    ),
    (
        PID_TAG_TRANSPORT_MESSAGE_HEADERS,
        "PidTagTransportMessageHeaders",
    ),
    (PID_TAG_RECIPIENT_TYPE, "PidTagRecipientType"),
    (PID_TAG_SENDER_NAME, "PidTagSenderName"),
    (PID_TAG_SENDER_EMAIL_ADDRESS, "PidTagSenderEmailAddress"),
    (PID_TAG_DISPLAY_BCC, "PidTagDisplayBcc"),
    (PID_TAG_DISPLAY_CC, "PidTagDisplayCc"),
    (PID_TAG_DISPLAY_TO, "PidTagDisplayTo"),
    (PID_TAG_MESSAGE_DELIVERY_TIME, "PidTagMessageDeliveryTime"),
    (PID_TAG_MESSAGE_FLAGS, "PidTagMessageFlags"),
    (PID_TAG_MESSAGE_SIZE, "PidTagMessageSize"),
    (PID_TAG_HAS_ATTACHMENTS, "PidTagHasAttachments"),
    (PID_TAG_ATTACH_SIZE, "PidTagAttachSize"),
    (PID_TAG_ATTACH_NUMBER, "PidTagAttachNumber"),
    (PID_TAG_RECORD_KEY, "PidTagRecordKey"),
    (PID_TAG_BODY, "PidTagBody"),
    (PID_TAG_RTF_COMPRESSED, "PidTagRtfCompressed"),
    (PID_TAG_BODY_HTML, "PidTagBodyHtml"),
    (PID_TAG_DISPLAY_NAME, "PidTagDisplayName"),
    (PID_TAG_ADDRESS_TYPE, "PidTagAddressType"),
    (PID_TAG_EMAIL_ADDRESS, "PidTagEmailAddress"),
    (PID_TAG_CREATION_TIME, "PidTagCreationTime"),
    (PID_TAG_IPM_SUB_TREE_ENTRY_ID, "PidTagIpmSubTreeEntryId"),
    (PID_TAG_CONTENT_COUNT, "PidTagContentCount"),
    (PID_TAG_CONTENT_UNREAD_COUNT, "PidTagContentUnreadCount"),
    (PID_TAG_SUBFOLDERS, "PidTagSubfolders"),
    (PID_TAG_CONTAINER_CLASS, "PidTagContainerClass"),
    (PID_TAG_ATTACH_DATA, "PidTagAttachDataBinary"),
    (PID_TAG_ATTACH_EXTENSION, "PidTagAttachExtension"),
    (PID_TAG_ATTACH_FILENAME, "PidTagAttachFilename"),
    (PID_TAG_ATTACH_METHOD, "PidTagAttachMethod"),
    (PID_TAG_ATTACH_LONG_FILENAME, "PidTagAttachLongFilename"),
    (PID_TAG_RENDERING_POSITION, "PidTagRenderingPosition"),
    (PID_TAG_ATTACH_MIME_TAG, "PidTagAttachMimeTag"),
    (PID_TAG_ATTACH_CONTENT_ID, "PidTagAttachContentId"),
    (PID_TAG_ATTACH_FLAGS, "PidTagAttachFlags"),
    (PID_TAG_SMTP_ADDRESS, "PidTagSmtpAddress"),
    (PID_TAG_INTERNET_CODEPAGE, "PidTagInternetCodepage"),
    (PID_TAG_MESSAGE_CODEPAGE, "PidTagMessageCodepage"),
    (PID_TAG_SENDER_SMTP_ADDRESS, "PidTagSenderSmtpAddress"),
    (
        PID_TAG_SENT_REPRESENTING_SMTP_ADDRESS,
        "PidTagSentRepresentingSmtpAddress",
    ),
    (PID_TAG_LTP_ROW_ID, "PidTagLtpRowId"),
    (PID_TAG_LTP_ROW_VERSION, "PidTagLtpRowVer"),
    (PID_TAG_ATTACHMENT_HIDDEN, "PidTagAttachmentHidden"),
];

/// Canonical name of a well-known property id.
pub fn tag_name(prop_id: u16) -> Option<&'static str> {
    KNOWN_TAGS
        .iter()
        .find(|(id, _)| *id == prop_id)
        .map(|(_, name)| *name)
}

/// Reverse of [tag_name].
pub fn tag_id(name: &str) -> Option<u16> {
    KNOWN_TAGS
        .iter()
        .find(|(_, known)| known.eq_ignore_ascii_case(name))
        .map(|(id, _)| *id)
}
