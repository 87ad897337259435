use clap::Parser;
use outlook_pst_reader::*;

mod args;

fn main() -> anyhow::Result<()> {
    args::init_tracing();
    let args = args::Args::try_parse()?;
    let pst = PstFile::open(&args.file)?;

    let header = pst.header();
    println!("File Version: {:?}", header.version());
    println!("Client Version: {}", header.client_version());
    println!("Crypt Method: {:?}", header.crypt_method());
    println!("Next Block: {:?}", header.next_block());
    println!("Next Page: {:?}", header.next_page());
    println!("Unique: 0x{:08X}", header.unique());

    let root = header.root();
    println!("File EOF Index: 0x{:X}", root.file_eof_index());
    println!("AMAP Last Index: 0x{:X}", root.amap_last_index());
    println!("NBT BlockRef: {:?}", root.node_btree());
    println!("BBT BlockRef: {:?}", root.block_btree());
    println!("AMAP Valid: {}", root.amap_is_valid());

    let store = pst.store()?;
    if let Some(name) = store.display_name() {
        println!("Store Name: {name}");
    }
    println!("Code Page: {}", store.code_page());

    Ok(())
}
