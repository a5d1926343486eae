//! Text generation port trait for the analyst note.

use crate::domain::error::PricecastError;

pub trait NotePort {
    fn generate(&self, prompt: &str) -> Result<String, PricecastError>;
}
