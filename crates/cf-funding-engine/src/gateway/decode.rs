//! Record decoding.
//!
//! The ledger answers with loosely shaped JSON. Everything that crosses into
//! the engine goes through here and is either a fully typed record or a
//! `Corrupt` error naming the offending field.

use serde_json::{Map, Value};

use crate::domain::{
    Address, Amount, FundingError, MilestoneIndex, MilestoneRecord, ProjectId, ProjectRecord,
    Receipt, TxHash,
};

type Object = Map<String, Value>;

fn as_object<'a>(value: &'a Value, what: &str) -> Result<&'a Object, FundingError> {
    value
        .as_object()
        .ok_or_else(|| FundingError::corrupt(format!("{}: expected object, got {}", what, value)))
}

fn field<'a>(obj: &'a Object, name: &str) -> Result<&'a Value, FundingError> {
    obj.get(name)
        .filter(|v| !v.is_null())
        .ok_or_else(|| FundingError::corrupt(format!("missing field `{}`", name)))
}

fn hex_digits(s: &str) -> Option<&str> {
    s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))
}

/// Decode an amount: decimal string, `0x` hex string, or non-negative integer.
pub fn amount(value: &Value, name: &str) -> Result<Amount, FundingError> {
    let bad = || FundingError::corrupt(format!("field `{}`: bad amount {}", name, value));
    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Some(digits) = hex_digits(s) {
                Amount::from_str_radix(digits, 16).map_err(|_| bad())
            } else {
                Amount::from_dec_str(s).map_err(|_| bad())
            }
        }
        Value::Number(n) => n.as_u64().map(Amount::from).ok_or_else(bad),
        _ => Err(bad()),
    }
}

/// Decode an address from a hex string.
pub fn address(value: &Value, name: &str) -> Result<Address, FundingError> {
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| FundingError::corrupt(format!("field `{}`: bad address {}", name, value)))
}

/// Decode an unsigned integer: JSON number or decimal string.
pub fn uint(value: &Value, name: &str) -> Result<u64, FundingError> {
    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| FundingError::corrupt(format!("field `{}`: bad integer {}", name, value)))
}

fn uint32(value: &Value, name: &str) -> Result<u32, FundingError> {
    let v = uint(value, name)?;
    u32::try_from(v)
        .map_err(|_| FundingError::corrupt(format!("field `{}`: {} out of range", name, v)))
}

/// Decode a boolean.
pub fn boolean(value: &Value, name: &str) -> Result<bool, FundingError> {
    value
        .as_bool()
        .ok_or_else(|| FundingError::corrupt(format!("field `{}`: bad bool {}", name, value)))
}

/// Decode a string.
pub fn string(value: &Value, name: &str) -> Result<String, FundingError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| FundingError::corrupt(format!("field `{}`: bad string {}", name, value)))
}

/// Decode a 32-byte transaction hash.
pub fn tx_hash(value: &Value, name: &str) -> Result<TxHash, FundingError> {
    let bad = || FundingError::corrupt(format!("field `{}`: bad hash {}", name, value));
    let s = value.as_str().ok_or_else(bad)?;
    let digits = hex_digits(s).unwrap_or(s);
    let mut out = [0u8; 32];
    hex::decode_to_slice(digits, &mut out).map_err(|_| bad())?;
    Ok(out)
}

/// Decode a point read of a project.
///
/// `Ok(None)` when the ledger answers `null` (no such project).
pub fn project(value: &Value) -> Result<Option<ProjectRecord>, FundingError> {
    if value.is_null() {
        return Ok(None);
    }
    let obj = as_object(value, "project")?;
    Ok(Some(ProjectRecord {
        id: uint(field(obj, "id")?, "id")?,
        name: string(field(obj, "name")?, "name")?,
        owner: address(field(obj, "charityAddress")?, "charityAddress")?,
        goal_amount: amount(field(obj, "goalAmount")?, "goalAmount")?,
        raised_amount: amount(field(obj, "raisedAmount")?, "raisedAmount")?,
        is_active: boolean(field(obj, "isActive")?, "isActive")?,
        milestone_count: uint32(field(obj, "milestoneCount")?, "milestoneCount")?,
    }))
}

fn column<'a>(
    obj: &'a Object,
    name: &str,
    len: Option<usize>,
) -> Result<&'a Vec<Value>, FundingError> {
    let col = field(obj, name)?
        .as_array()
        .ok_or_else(|| FundingError::corrupt(format!("column `{}` is not an array", name)))?;
    if let Some(expected) = len {
        if col.len() != expected {
            return Err(FundingError::corrupt(format!(
                "column `{}` has {} entries, expected {}",
                name,
                col.len(),
                expected
            )));
        }
    }
    Ok(col)
}

/// Decode the bulk read: parallel columns, one row per project.
///
/// A shape problem (missing column, unequal lengths) fails the whole read.
/// A bad cell fails only its row, so a single malformed project can be
/// excluded without hiding the others.
pub fn project_columns(
    value: &Value,
) -> Result<Vec<Result<ProjectRecord, FundingError>>, FundingError> {
    let obj = as_object(value, "projects")?;
    let ids = column(obj, "id", None)?;
    let len = Some(ids.len());
    let names = column(obj, "name", len)?;
    let owners = column(obj, "charityAddress", len)?;
    let goals = column(obj, "goalAmount", len)?;
    let raised = column(obj, "raisedAmount", len)?;
    let active = column(obj, "isActive", len)?;
    let counts = column(obj, "milestoneCount", len)?;

    let rows: Vec<_> = (0..ids.len())
        .map(|i| -> Result<ProjectRecord, FundingError> {
            Ok(ProjectRecord {
                id: uint(&ids[i], "id")?,
                name: string(&names[i], "name")?,
                owner: address(&owners[i], "charityAddress")?,
                goal_amount: amount(&goals[i], "goalAmount")?,
                raised_amount: amount(&raised[i], "raisedAmount")?,
                is_active: boolean(&active[i], "isActive")?,
                milestone_count: uint32(&counts[i], "milestoneCount")?,
            })
        })
        .collect();
    Ok(rows)
}

/// Decode a milestone read, checking it is the one asked for.
pub fn milestone(
    value: &Value,
    project_id: ProjectId,
    expected_index: MilestoneIndex,
) -> Result<MilestoneRecord, FundingError> {
    let obj = as_object(value, "milestone")?;
    let index = match obj.get("index") {
        Some(v) if !v.is_null() => uint32(v, "index")?,
        _ => expected_index,
    };
    if index != expected_index {
        return Err(FundingError::corrupt(format!(
            "project {}: asked for milestone {}, got {}",
            project_id, expected_index, index
        )));
    }

    let record = MilestoneRecord {
        index,
        description: string(field(obj, "description")?, "description")?,
        target_amount: amount(field(obj, "targetAmount")?, "targetAmount")?,
        raised_amount: amount(field(obj, "raisedAmount")?, "raisedAmount")?,
    };

    // The ledger may echo a completion flag; it must agree with the amounts.
    if let Some(flag) = obj.get("isCompleted").filter(|v| !v.is_null()) {
        let flag = boolean(flag, "isCompleted")?;
        if flag != (record.raised_amount >= record.target_amount) {
            return Err(FundingError::corrupt(format!(
                "project {}: milestone {} completion flag disagrees with amounts",
                project_id, index
            )));
        }
    }
    Ok(record)
}

/// Decode a receipt. A reverted transaction is a `Rejected` error.
pub fn receipt(value: &Value, expected: &TxHash) -> Result<Receipt, FundingError> {
    let obj = as_object(value, "receipt")?;
    let hash = tx_hash(field(obj, "txHash")?, "txHash")?;
    if &hash != expected {
        return Err(FundingError::corrupt(format!(
            "receipt for 0x{} returned for 0x{}",
            hex::encode(hash),
            hex::encode(expected)
        )));
    }

    match field(obj, "status")?.as_str() {
        Some("success") => {}
        Some("reverted") => {
            let reason = obj
                .get("reason")
                .and_then(Value::as_str)
                .unwrap_or("reverted without reason");
            return Err(FundingError::Rejected(reason.to_string()));
        }
        _ => {
            return Err(FundingError::corrupt(format!(
                "receipt status {}",
                obj["status"]
            )))
        }
    }

    let project_id = match obj.get("projectId") {
        Some(v) if !v.is_null() => Some(uint(v, "projectId")?),
        _ => None,
    };

    Ok(Receipt {
        tx_hash: hash,
        block_number: uint(field(obj, "blockNumber")?, "blockNumber")?,
        project_id,
    })
}

/// Encode an amount as a decimal string.
pub fn encode_amount(amount: Amount) -> Value {
    Value::String(amount.to_string())
}

/// Encode an address as lowercase hex.
pub fn encode_address(address: &Address) -> Value {
    Value::String(address.to_string())
}
