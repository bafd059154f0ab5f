use super::open_history;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let summary = open_history().summary();
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
