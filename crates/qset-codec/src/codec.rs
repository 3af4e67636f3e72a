//! MessagePack envelope encoder/decoder.
//!
//! The generic tree (nil, bool, int, float, str, bin, array, map) maps onto
//! plain MessagePack; the four temporal/decimal variants travel as ext
//! types (see [`crate::ext`]).

use rmpv::Value as Wire;

use crate::error::CodecError;
use crate::ext::{
    pack_date, pack_datetime, pack_decimal, pack_time, pack_zoned_datetime, unpack_date,
    unpack_datetime, unpack_decimal, unpack_time, PackedDateTime, EXT_DATE, EXT_DATETIME,
    EXT_DECIMAL, EXT_TIME,
};
use crate::value::{Map, MapKey, Value};

/// Encode a value into a MessagePack envelope.
pub fn encode(value: &Value) -> Result<Vec<u8>, CodecError> {
    let wire = to_wire(value)?;
    let mut buf = Vec::new();
    rmpv::encode::write_value(&mut buf, &wire).map_err(|e| CodecError::Write(e.to_string()))?;
    Ok(buf)
}

/// Decode a MessagePack envelope. The input must hold exactly one value.
pub fn decode(bytes: &[u8]) -> Result<Value, CodecError> {
    let mut rest = bytes;
    let wire =
        rmpv::decode::read_value(&mut rest).map_err(|e| CodecError::Malformed(e.to_string()))?;
    if !rest.is_empty() {
        return Err(CodecError::Malformed(format!(
            "{} trailing bytes after envelope",
            rest.len()
        )));
    }
    from_wire(wire)
}

fn int_to_wire(i: i128) -> Result<Wire, CodecError> {
    if let Ok(v) = i64::try_from(i) {
        Ok(Wire::from(v))
    } else if let Ok(v) = u64::try_from(i) {
        Ok(Wire::from(v))
    } else {
        Err(CodecError::UnsupportedType {
            type_name: "int",
            detail: format!("{i} does not fit in 64 bits"),
        })
    }
}

fn to_wire(value: &Value) -> Result<Wire, CodecError> {
    Ok(match value {
        Value::Nil => Wire::Nil,
        Value::Bool(b) => Wire::Boolean(*b),
        Value::Int(i) => int_to_wire(*i)?,
        Value::Float(x) => Wire::F64(*x),
        Value::Str(s) => Wire::String(s.as_str().into()),
        Value::Bin(b) => Wire::Binary(b.clone()),
        Value::Array(items) => Wire::Array(items.iter().map(to_wire).collect::<Result<_, _>>()?),
        Value::Map(map) => {
            let mut entries = Vec::with_capacity(map.len());
            for (k, v) in map {
                let key = match k {
                    MapKey::Str(s) => Wire::String(s.as_str().into()),
                    MapKey::Int(i) => int_to_wire(*i)?,
                };
                entries.push((key, to_wire(v)?));
            }
            Wire::Map(entries)
        }
        Value::Date(d) => Wire::Ext(EXT_DATE, pack_date(d)),
        Value::DateTime(dt) => Wire::Ext(EXT_DATETIME, pack_datetime(dt)),
        Value::ZonedDateTime(dt) => Wire::Ext(EXT_DATETIME, pack_zoned_datetime(dt)),
        Value::Time(t) => Wire::Ext(EXT_TIME, pack_time(t)),
        Value::Decimal(d) => Wire::Ext(EXT_DECIMAL, pack_decimal(d)),
    })
}

fn wire_int(i: &rmpv::Integer) -> Result<i128, CodecError> {
    i.as_i64()
        .map(i128::from)
        .or_else(|| i.as_u64().map(i128::from))
        .ok_or_else(|| CodecError::Malformed(format!("unreadable integer {i}")))
}

fn from_wire(wire: Wire) -> Result<Value, CodecError> {
    Ok(match wire {
        Wire::Nil => Value::Nil,
        Wire::Boolean(b) => Value::Bool(b),
        Wire::Integer(i) => Value::Int(wire_int(&i)?),
        Wire::F32(x) => Value::Float(f64::from(x)),
        Wire::F64(x) => Value::Float(x),
        Wire::String(s) => Value::Str(
            s.into_str()
                .ok_or_else(|| CodecError::Malformed("string is not valid UTF-8".into()))?,
        ),
        Wire::Binary(b) => Value::Bin(b),
        Wire::Array(items) => {
            Value::Array(items.into_iter().map(from_wire).collect::<Result<_, _>>()?)
        }
        Wire::Map(entries) => {
            let mut map = Map::with_capacity(entries.len());
            for (k, v) in entries {
                let key = match k {
                    Wire::String(s) => MapKey::Str(s.into_str().ok_or_else(|| {
                        CodecError::Malformed("map key is not valid UTF-8".into())
                    })?),
                    Wire::Integer(i) => MapKey::Int(wire_int(&i)?),
                    other => {
                        return Err(CodecError::UnsupportedType {
                            type_name: "map key",
                            detail: format!("keys must be str or int, got {other}"),
                        })
                    }
                };
                map.insert(key, from_wire(v)?);
            }
            Value::Map(map)
        }
        Wire::Ext(tag, data) => match tag {
            EXT_DATE => Value::Date(unpack_date(&data)?),
            EXT_DATETIME => match unpack_datetime(&data)? {
                PackedDateTime::Naive(dt) => Value::DateTime(dt),
                PackedDateTime::Zoned(dt) => Value::ZonedDateTime(dt),
            },
            EXT_DECIMAL => Value::Decimal(unpack_decimal(&data)?),
            EXT_TIME => Value::Time(unpack_time(&data)?),
            tag => return Err(CodecError::UnknownExtension { tag }),
        },
    })
}
