use bodydouble_core::{AckMailbox, DataPaths, FileAckMailbox};

pub fn run(content: &str) -> Result<(), Box<dyn std::error::Error>> {
    let content = content.trim();
    if content.is_empty() {
        return Err("acknowledgment is empty".into());
    }
    let paths = DataPaths::discover()?;
    FileAckMailbox::new(paths.ack()).post(content)?;
    println!("ok");
    Ok(())
}
