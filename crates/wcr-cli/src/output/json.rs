use serde::Serialize;
use wcr_core::error::WcrError;

pub fn print<T: Serialize + ?Sized>(value: &T) -> Result<(), WcrError> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}
