use clap::Parser;

#[derive(Parser)]
#[command(version, about, long_about)]
pub struct Args {
    /// Path to a `.pst` file
    pub file: String,
}

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}
