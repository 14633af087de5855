use rand::Rng;

/// Generates an identifier for a surgical case submitted without one.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Generates a walk-in emergency token of the form `EMERG-NNNN`.
pub fn emergency_token() -> String {
    let n: u16 = rand::thread_rng().gen_range(1000..=9999);
    format!("EMERG-{n}")
}
