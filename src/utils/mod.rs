pub mod time;

/// Generates a unique identifier for runs and stored records.
pub fn longid() -> String {
    nanoid::nanoid!()
}
