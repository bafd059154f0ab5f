use pausitive_core::catalog::{format_duration, session_duration_secs, MAX_SETS, MIN_SETS};
use pausitive_core::Config;

pub fn techniques(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = Config::load_or_default().catalog();
    if json {
        println!("{}", serde_json::to_string_pretty(&catalog.techniques)?);
        return Ok(());
    }
    for t in &catalog.techniques {
        println!(
            "{:<16} {:<16} in {:>4}s  out {:>4}s  {:?}",
            t.id, t.name, t.inhale_secs, t.exhale_secs, t.level
        );
    }
    Ok(())
}

pub fn modes(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let catalog = config.catalog();
    if json {
        println!("{}", serde_json::to_string_pretty(&catalog.modes)?);
        return Ok(());
    }
    let technique = catalog.technique(&config.session.default_technique)?;
    for m in &catalog.modes {
        match m.sets {
            Some(sets) => {
                let secs = session_duration_secs(technique, sets);
                println!(
                    "{:<12} {:<12} {:>3} sets  {} with {}",
                    m.id,
                    m.name,
                    sets,
                    format_duration(secs.round() as u64),
                    technique.name
                );
            }
            None => println!(
                "{:<12} {:<12} choose {MIN_SETS}-{MAX_SETS} sets with --sets",
                m.id, m.name
            ),
        }
    }
    Ok(())
}
