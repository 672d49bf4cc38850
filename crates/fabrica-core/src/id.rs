/// Generate a unique identifier for jobs and other records.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
