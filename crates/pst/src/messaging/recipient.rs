//! ## [Recipients](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-pst/9fb3e2f5-1ec1-4d67-a6ad-9eb6ad6c1e85)
//!
//! One row of a message's recipient table.

use super::tags::*;
use crate::ltp::{prop_context::PropertySet, table_context::TableRow};

/// `PidTagRecipientType`, without the `MAPI_P1`/`MAPI_SUBMITTED` flag bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecipientType {
    Originator,
    To,
    Cc,
    Bcc,
    Other(i32),
}

impl From<i32> for RecipientType {
    fn from(value: i32) -> Self {
        match value & 0x0FFF_FFFF {
            0 => Self::Originator,
            1 => Self::To,
            2 => Self::Cc,
            3 => Self::Bcc,
            other => Self::Other(other),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Recipient {
    display_name: String,
    email: Option<String>,
    recipient_type: RecipientType,
    properties: PropertySet,
}

impl Recipient {
    pub fn from_row(row: &TableRow, code_page: u16) -> Self {
        let properties = row.values().clone();
        let display_name = properties
            .text(PID_TAG_DISPLAY_NAME, code_page)
            .unwrap_or_default();
        let email = properties
            .text(PID_TAG_SMTP_ADDRESS, code_page)
            .or_else(|| properties.text(PID_TAG_EMAIL_ADDRESS, code_page))
            .filter(|email| !email.is_empty());
        let recipient_type = properties
            .i32(PID_TAG_RECIPIENT_TYPE)
            .map_or(RecipientType::To, RecipientType::from);

        Self {
            display_name,
            email,
            recipient_type,
            properties,
        }
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// SMTP address when one is known, else `PidTagEmailAddress`.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn recipient_type(&self) -> RecipientType {
        self.recipient_type
    }

    pub fn properties(&self) -> &PropertySet {
        &self.properties
    }
}
