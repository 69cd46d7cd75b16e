//! Management endpoint wire protocol.
//!
//! One JSON document per line over a TCP stream; the client sends a
//! request frame and reads exactly one response frame back.

use crate::config::types::{Result, RigError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{BufRead, Write};

/// Declared parameter of a managed operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamInfo {
    pub name: String,
    /// Declared type ("string", "int", "bool", ...) used verbatim as the
    /// invocation signature element.
    pub param_type: String,
}

/// Operation exposed by a managed object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationInfo {
    pub name: String,
    pub params: Vec<ParamInfo>,
}

impl OperationInfo {
    pub fn signature(&self) -> Vec<String> {
        self.params.iter().map(|p| p.param_type.clone()).collect()
    }
}

/// Metadata describing one managed object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// Qualified name, `<domain>:type=<TypeName>[,<key>=<value>]*`.
    pub name: String,
    /// Declared type, matched exactly by queries.
    pub type_name: String,
    pub operations: Vec<OperationInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum McRequest {
    ListObjects,
    DescribeObject {
        object: String,
    },
    Invoke {
        object: String,
        operation: String,
        params: Vec<Value>,
        signature: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum McResponse {
    Objects { objects: Vec<ObjectInfo> },
    Object { info: Option<ObjectInfo> },
    InvokeResult { value: Value },
    Error { message: String },
}

/// Write one frame and flush it.
pub fn write_frame<T: Serialize, W: Write>(writer: &mut W, value: &T) -> Result<()> {
    let payload = serde_json::to_string(value)
        .map_err(|e| RigError::Protocol(format!("failed to encode frame: {}", e)))?;
    writer.write_all(payload.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Read one frame; EOF before a full line is a connection error.
pub fn read_frame<T: DeserializeOwned, R: BufRead>(reader: &mut R) -> Result<T> {
    let mut line = String::new();
    let n = reader.read_line(&mut line)?;
    if n == 0 {
        return Err(RigError::Connect("connection closed by peer".to_string()));
    }
    serde_json::from_str(line.trim_end())
        .map_err(|e| RigError::Protocol(format!("failed to decode frame: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;

    #[test]
    fn test_frame_round_trip() {
        let req = McRequest::Invoke {
            object: "rigbox:type=ShutdownBean".to_string(),
            operation: "shutdown".to_string(),
            params: vec![],
            signature: vec![],
        };

        let mut buf = Vec::new();
        write_frame(&mut buf, &req).unwrap();

        let mut reader = BufReader::new(buf.as_slice());
        let decoded: McRequest = read_frame(&mut reader).unwrap();
        assert_eq!(decoded, req);
    }

    #[test]
    fn test_read_frame_on_closed_stream() {
        let mut reader = BufReader::new(&b""[..]);
        let result: Result<McRequest> = read_frame(&mut reader);
        assert!(matches!(result, Err(RigError::Connect(_))));
    }

    #[test]
    fn test_garbage_frame_is_protocol_error() {
        let mut reader = BufReader::new(&b"not json\n"[..]);
        let result: Result<McResponse> = read_frame(&mut reader);
        assert!(matches!(result, Err(RigError::Protocol(_))));
    }
}
