use crate::runtime::{
    data_structures::{
        value::{DateTime, Value},
        words::Word,
    },
    error::{self, ErrorKind, ScriptError},
    interpreter::Interpreter,
};
use std::rc::Rc;

/// The transport behind remote words.  A remote word hands the transport its name and a snapshot
/// of the interpreter stack; on success the transport returns the values the remote runtime left
/// behind, which replace the local stack.
///
/// The transport MAY block for the duration of a round-trip.  This is the only latency point in
/// the core and it is not surfaced as suspension, the thread simply waits.
///
/// Transports are explicit instances handed to each remote word.  There is no process-wide
/// registry.
pub trait RemoteTransport {
    /// Execute a word remotely against the given stack snapshot.  An Err return is surfaced to
    /// the script as a remote execution failure.
    fn call(&self, word: &str, stack: &[Value]) -> Result<Vec<Value>, String>;
}

/// Install a remote word into the interpreter's current module.
pub fn register_remote_word(
    interpreter: &mut dyn Interpreter,
    name: &str,
    transport: Rc<dyn RemoteTransport>,
) {
    interpreter.add_word(
        name.to_string(),
        Word::new_remote(name.to_string(), transport),
    );
}

// Wire tags, one per value case.
const TAG_NULL: u8 = 0;
const TAG_BOOL: u8 = 1;
const TAG_INT: u8 = 2;
const TAG_FLOAT: u8 = 3;
const TAG_STRING: u8 = 4;
const TAG_ARRAY: u8 = 5;
const TAG_RECORD: u8 = 6;
const TAG_DATETIME: u8 = 7;

/// Serialize a stack of values for a transport round-trip.  The payload carries a length-prefixed
/// sequence of tagged values; arrays carry length-prefixed items and records carry
/// length-prefixed (key, value) pairs.
pub fn serialize_values(values: &[Value]) -> error::Result<Vec<u8>> {
    let mut buffer = Vec::new();

    write_u32(&mut buffer, values.len() as u32);

    for value in values {
        serialize_value(&mut buffer, value)?;
    }

    Ok(buffer)
}

/// Deserialize a transport payload back into values.
pub fn deserialize_values(buffer: &[u8]) -> error::Result<Vec<Value>> {
    let mut reader = Reader::new(buffer);
    let count = reader.read_u32()?;

    let mut values = Vec::with_capacity(count as usize);

    for _ in 0..count {
        values.push(reader.read_value()?);
    }

    Ok(values)
}

fn serialize_value(buffer: &mut Vec<u8>, value: &Value) -> error::Result<()> {
    match value {
        Value::Null => buffer.push(TAG_NULL),

        Value::Bool(flag) => {
            buffer.push(TAG_BOOL);
            buffer.push(*flag as u8);
        }

        Value::Int(number) => {
            buffer.push(TAG_INT);
            buffer.extend_from_slice(&number.to_le_bytes());
        }

        Value::Float(number) => {
            buffer.push(TAG_FLOAT);
            buffer.extend_from_slice(&number.to_le_bytes());
        }

        Value::String(text) => {
            buffer.push(TAG_STRING);
            write_bytes(buffer, text.as_bytes());
        }

        Value::Array(items) => {
            buffer.push(TAG_ARRAY);
            write_u32(buffer, items.len() as u32);

            for item in items {
                serialize_value(buffer, item)?;
            }
        }

        Value::Record(entries) => {
            buffer.push(TAG_RECORD);
            write_u32(buffer, entries.len() as u32);

            // Records are unordered, sort the keys so the payload bytes are stable.
            let mut keys: Vec<&String> = entries.keys().collect();
            keys.sort();

            for key in keys {
                write_bytes(buffer, key.as_bytes());
                serialize_value(buffer, &entries[key])?;
            }
        }

        Value::DateTime(datetime) => {
            buffer.push(TAG_DATETIME);
            buffer.extend_from_slice(&datetime.year.to_le_bytes());
            buffer.push(datetime.month);
            buffer.push(datetime.day);
            buffer.push(datetime.hour);
            buffer.push(datetime.minute);
            buffer.push(datetime.second);
        }

        Value::ArrayMarker => {
            return ScriptError::new_as_result(
                None,
                ErrorKind::TypeMismatch("An array marker is not serializable.".to_string()),
            );
        }
    }

    Ok(())
}

fn write_u32(buffer: &mut Vec<u8>, value: u32) {
    buffer.extend_from_slice(&value.to_le_bytes());
}

fn write_bytes(buffer: &mut Vec<u8>, bytes: &[u8]) {
    write_u32(buffer, bytes.len() as u32);
    buffer.extend_from_slice(bytes);
}

/// A forward-only reader over a transport payload.
struct Reader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> Reader<'a> {
    fn new(buffer: &'a [u8]) -> Reader<'a> {
        Reader {
            buffer,
            position: 0,
        }
    }

    fn truncated<T>() -> error::Result<T> {
        ScriptError::new_as_result(
            None,
            ErrorKind::RemoteExecutionFailed("truncated payload".to_string()),
        )
    }

    fn read_exact(&mut self, count: usize) -> error::Result<&'a [u8]> {
        if self.position + count > self.buffer.len() {
            return Reader::truncated();
        }

        let slice = &self.buffer[self.position..self.position + count];
        self.position += count;

        Ok(slice)
    }

    fn read_u8(&mut self) -> error::Result<u8> {
        Ok(self.read_exact(1)?[0])
    }

    fn read_u32(&mut self) -> error::Result<u32> {
        let bytes = self.read_exact(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_string(&mut self) -> error::Result<String> {
        let length = self.read_u32()? as usize;
        let bytes = self.read_exact(length)?;

        match String::from_utf8(bytes.to_vec()) {
            Ok(text) => Ok(text),
            Err(_) => ScriptError::new_as_result(
                None,
                ErrorKind::RemoteExecutionFailed("payload string is not UTF-8".to_string()),
            ),
        }
    }

    fn read_value(&mut self) -> error::Result<Value> {
        let tag = self.read_u8()?;

        match tag {
            TAG_NULL => Ok(Value::Null),

            TAG_BOOL => Ok(Value::Bool(self.read_u8()? != 0)),

            TAG_INT => {
                let bytes = self.read_exact(8)?;
                let mut raw = [0u8; 8];
                raw.copy_from_slice(bytes);
                Ok(Value::Int(i64::from_le_bytes(raw)))
            }

            TAG_FLOAT => {
                let bytes = self.read_exact(8)?;
                let mut raw = [0u8; 8];
                raw.copy_from_slice(bytes);
                Ok(Value::Float(f64::from_le_bytes(raw)))
            }

            TAG_STRING => Ok(Value::String(self.read_string()?)),

            TAG_ARRAY => {
                let count = self.read_u32()? as usize;
                let mut items = Vec::with_capacity(count);

                for _ in 0..count {
                    items.push(self.read_value()?);
                }

                Ok(Value::Array(items))
            }

            TAG_RECORD => {
                let count = self.read_u32()? as usize;
                let mut entries = std::collections::HashMap::with_capacity(count);

                for _ in 0..count {
                    let key = self.read_string()?;
                    let value = self.read_value()?;
                    entries.insert(key, value);
                }

                Ok(Value::Record(entries))
            }

            TAG_DATETIME => {
                let year_bytes = self.read_exact(4)?;
                let mut raw = [0u8; 4];
                raw.copy_from_slice(year_bytes);

                Ok(Value::DateTime(DateTime {
                    year: i32::from_le_bytes(raw),
                    month: self.read_u8()?,
                    day: self.read_u8()?,
                    hour: self.read_u8()?,
                    minute: self.read_u8()?,
                    second: self.read_u8()?,
                }))
            }

            _ => ScriptError::new_as_result(
                None,
                ErrorKind::RemoteExecutionFailed(format!("unknown value tag {}", tag)),
            ),
        }
    }
}
