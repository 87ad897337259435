use clap::Parser;
use outlook_pst_reader::{
    messaging::{folder::Folder, store::Store},
    ndb::node_id::NodeId,
    *,
};
use std::collections::HashSet;

mod args;

fn main() -> anyhow::Result<()> {
    args::init_tracing();
    let args = args::Args::try_parse()?;
    let pst = PstFile::open(&args.file)?;
    let store = pst.store()?;
    let root = pst.root_folder()?;

    let mut visited = HashSet::new();
    visited.insert(root.id());
    print_folder(&pst, &store, &root, 0, &mut visited);

    for warning in pst.diagnostics().take() {
        eprintln!("warning: {warning}");
    }

    Ok(())
}

fn print_folder(
    pst: &PstFile,
    store: &Store,
    folder: &Folder,
    depth: usize,
    visited: &mut HashSet<NodeId>,
) {
    let indent = "  ".repeat(depth);
    let name = folder.display_name();
    let name = if name.is_empty() { "<root>" } else { name.as_str() };
    let kind = if folder.is_search_folder() { " [search]" } else { "" };
    let count = folder.content_count().unwrap_or_default();
    let unread = folder.unread_count().unwrap_or_default();
    println!("{indent}{name}{kind} ({count} items, {unread} unread) {}", folder.id());

    for &id in folder.sub_folders() {
        if !visited.insert(id) {
            println!("{indent}  <cycle at {id}>");
            continue;
        }
        match Folder::read(pst, store, id) {
            Ok(sub_folder) => print_folder(pst, store, &sub_folder, depth + 1, visited),
            Err(err) => println!("{indent}  <unreadable {id}: {err}>"),
        }
    }
}
