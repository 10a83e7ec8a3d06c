use super::open_service;

pub fn run(url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let service = open_service()?;
    let decision = service.decide(url);
    let verdict = if decision.is_blocked() { "blocked" } else { "allowed" };
    println!("{verdict}");
    println!("{}", serde_json::to_string_pretty(&decision)?);
    Ok(())
}
