//! JSON line output for the CLI
//!
//! - One JSON object per line on stdout
//! - `{"status":"ok","data":...}` or `{"status":"error","code":...,"message":...}`

use std::io::{self, Write};

use serde::Serialize;
use serde_json::{json, Value};

use super::errors::CliResult;

fn write_line<W: Write>(writer: &mut W, value: &Value) -> CliResult<()> {
    serde_json::to_writer(&mut *writer, value)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

fn ok_envelope<T: Serialize>(data: &T) -> CliResult<Value> {
    Ok(json!({
        "status": "ok",
        "data": serde_json::to_value(data)?
    }))
}

fn error_envelope(code: &str, message: &str) -> Value {
    json!({
        "status": "error",
        "code": code,
        "message": message
    })
}

/// Write a success response to stdout
pub fn write_response<T: Serialize>(data: &T) -> CliResult<()> {
    write_line(&mut io::stdout(), &ok_envelope(data)?)
}

/// Write an error response to stdout
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    write_line(&mut io::stdout(), &error_envelope(code, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryResult;

    #[test]
    fn test_ok_envelope() {
        let mut buffer = Vec::new();
        let value = ok_envelope(&QueryResult::affected(2)).unwrap();
        write_line(&mut buffer, &value).unwrap();

        let line = String::from_utf8(buffer).unwrap();
        assert!(line.ends_with('\n'));
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["data"]["rows_affected"], 2);
    }

    #[test]
    fn test_error_envelope() {
        let value = error_envelope("GATEWAY_NO_PRIMARY", "no serving primary tablet available");
        assert_eq!(value["status"], "error");
        assert_eq!(value["code"], "GATEWAY_NO_PRIMARY");
    }
}
