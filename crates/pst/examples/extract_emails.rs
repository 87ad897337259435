use anyhow::Context;
use clap::Parser;
use outlook_pst_reader::{messaging::message::MessageBody, walker::*, *};
use std::{fs, path::PathBuf, sync::Arc};

mod args;

#[derive(Parser)]
#[command(version, about, long_about)]
struct ExtractArgs {
    #[command(flatten)]
    source: args::Args,

    /// Stop after this many records
    #[arg(long)]
    limit: Option<usize>,

    /// Write attachment payloads under this directory
    #[arg(long)]
    output: Option<PathBuf>,

    /// Also walk search folders
    #[arg(long)]
    search_folders: bool,

    /// Yield every message class, not just `IPM.Note`
    #[arg(long)]
    all_classes: bool,
}

fn main() -> anyhow::Result<()> {
    args::init_tracing();
    let args = ExtractArgs::try_parse()?;
    let pst = Arc::new(PstFile::open(&args.source.file)?);

    let mut options = WalkOptions::new()
        .emails_only(!args.all_classes)
        .include_search_folders(args.search_folders);
    if let Some(limit) = args.limit {
        options = options.limit(limit);
    }

    let mut walker = pst.walk_emails(options);
    for record in walker.by_ref() {
        let record = record?;
        print_record(&record);

        if let Some(output) = &args.output {
            save_attachments(output, &record)?;
        }
    }

    let summary = walker.summary();
    println!(
        "{} records, {} messages skipped, {} folders skipped",
        summary.yielded, summary.skipped_messages, summary.skipped_folders
    );
    for skipped in &summary.skipped {
        println!("  skipped {}: {}", skipped.node_id, skipped.reason);
    }
    for warning in pst.diagnostics().take() {
        eprintln!("warning: {warning}");
    }

    Ok(())
}

fn print_record(record: &EmailRecord) {
    println!("{} [{}]", record.identifier(), record.folder_path());
    println!(" Subject: {}", record.subject());
    match record.sender_email() {
        Some(email) => println!(" From: {} <{email}>", record.sender()),
        None => println!(" From: {}", record.sender()),
    }
    println!(" To: {}", record.to());
    if !record.cc().is_empty() {
        println!(" Cc: {}", record.cc());
    }
    if let Some(time) = record.delivery_time() {
        println!(" Date: {}", time.to_rfc2822());
    }
    println!(" Class: {}", record.message_class());
    println!(" Direction: {:?}", record.direction());

    match record.body() {
        MessageBody::Text(text) => println!(" Body: {} chars of text", text.chars().count()),
        MessageBody::Html(html) => println!(" Body: {} chars of HTML", html.chars().count()),
        MessageBody::Rtf(rtf) => println!(" Body: {} bytes of compressed RTF", rtf.len()),
        MessageBody::Empty => println!(" Body: <empty>"),
    }

    for attachment in record.attachments() {
        println!(
            " Attachment: {} ({}, {} bytes{})",
            attachment.filename(),
            attachment.mime_type().unwrap_or("application/octet-stream"),
            attachment.size().unwrap_or_default(),
            if attachment.is_inline() { ", inline" } else { "" }
        );
    }
}

fn save_attachments(output: &std::path::Path, record: &EmailRecord) -> anyhow::Result<()> {
    if record.attachments().is_empty() {
        return Ok(());
    }

    let directory = output.join(format!("{:08X}", u32::from(record.identifier())));
    fs::create_dir_all(&directory)
        .with_context(|| format!("creating {}", directory.display()))?;

    for attachment in record.attachments() {
        let payload = match attachment.load() {
            Ok(payload) => payload,
            Err(err) => {
                eprintln!("skipping {}: {err}", attachment.filename());
                continue;
            }
        };

        // Strip any directory components the stored name carries.
        let name = std::path::Path::new(attachment.filename())
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{:08X}.bin", u32::from(attachment.id())));
        let path = directory.join(name);
        fs::write(&path, payload).with_context(|| format!("writing {}", path.display()))?;
    }

    Ok(())
}
