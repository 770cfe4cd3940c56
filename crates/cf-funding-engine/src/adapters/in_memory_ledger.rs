//! In-Memory Ledger Adapter
//!
//! Implements `LedgerTransport` by emulating the charity platform contract
//! in process: projects, milestones, per-donor totals, owner-only
//! deactivation and an optional milestone-cap guard.
//!
//! Writes take effect at submission; confirmation can be delayed and
//! outages injected for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::domain::{Address, Amount, FundingError, ProjectId, TxHash};
use crate::gateway::{decode, methods};
use crate::ports::{LedgerTransport, TransactionRequest};

#[derive(Clone, Debug)]
struct StoredMilestone {
    description: String,
    target: Amount,
    raised: Amount,
    donations: HashMap<Address, Amount>,
}

#[derive(Clone, Debug)]
struct StoredProject {
    name: String,
    owner: Address,
    goal: Amount,
    raised: Amount,
    is_active: bool,
    milestones: Vec<StoredMilestone>,
    donations: HashMap<Address, Amount>,
}

impl StoredProject {
    fn to_json(&self, id: ProjectId) -> Value {
        json!({
            "id": id,
            "name": self.name,
            "charityAddress": self.owner.to_string(),
            "goalAmount": self.goal.to_string(),
            "raisedAmount": self.raised.to_string(),
            "isActive": self.is_active,
            "milestoneCount": self.milestones.len(),
        })
    }
}

#[derive(Debug, Default)]
struct Contract {
    projects: Vec<StoredProject>,
}

#[derive(Default)]
struct LedgerState {
    contracts: HashMap<String, Contract>,
    receipts: HashMap<TxHash, Value>,
    block_number: u64,
    nonce: u64,
    injected: HashMap<String, Value>,
}

/// Reason a write reverts.
type Revert = String;

/// In-process ledger for tests and demos.
pub struct InMemoryLedger {
    state: RwLock<LedgerState>,
    confirmation_delay: RwLock<Duration>,
    failing_calls: AtomicU32,
    failing_submits: AtomicU32,
    enforce_caps: AtomicBool,
}

impl InMemoryLedger {
    /// Create an empty ledger with the milestone-cap guard on.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(LedgerState::default()),
            confirmation_delay: RwLock::new(Duration::ZERO),
            failing_calls: AtomicU32::new(0),
            failing_submits: AtomicU32::new(0),
            enforce_caps: AtomicBool::new(true),
        }
    }

    /// Delay every confirmation by `delay`.
    pub fn set_confirmation_delay(&self, delay: Duration) {
        *self.confirmation_delay.write() = delay;
    }

    /// Make the next `n` reads fail with `Unreachable`.
    pub fn fail_next_calls(&self, n: u32) {
        self.failing_calls.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` submissions fail with `Unreachable`.
    pub fn fail_next_submits(&self, n: u32) {
        self.failing_submits.store(n, Ordering::SeqCst);
    }

    /// Toggle the contract-side milestone-cap guard. With it off, racing
    /// donors can over-fund a milestone.
    pub fn set_enforce_milestone_caps(&self, enforce: bool) {
        self.enforce_caps.store(enforce, Ordering::SeqCst);
    }

    /// Answer `method(args)` with `response` instead of the real state.
    pub fn inject_response(&self, method: &str, args: Vec<Value>, response: Value) {
        self.state
            .write()
            .injected
            .insert(injection_key(method, &args), response);
    }

    /// Current block number.
    pub fn block_number(&self) -> u64 {
        self.state.read().block_number
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn injection_key(method: &str, args: &[Value]) -> String {
    format!("{}{}", method, Value::Array(args.to_vec()))
}

fn digest(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    let result = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&result);
    out
}

fn arg<'a>(args: &'a [Value], i: usize) -> Result<&'a Value, Revert> {
    args.get(i).ok_or_else(|| format!("missing argument {}", i))
}

fn arg_uint(args: &[Value], i: usize) -> Result<u64, Revert> {
    decode::uint(arg(args, i)?, "arg").map_err(|e| e.to_string())
}

fn arg_address(args: &[Value], i: usize) -> Result<Address, Revert> {
    decode::address(arg(args, i)?, "arg").map_err(|e| e.to_string())
}

fn project_ref(contract: &Contract, id: u64) -> Result<&StoredProject, Revert> {
    contract
        .projects
        .get(id as usize)
        .ok_or_else(|| "project does not exist".to_string())
}

fn project_mut(contract: &mut Contract, id: u64) -> Result<&mut StoredProject, Revert> {
    contract
        .projects
        .get_mut(id as usize)
        .ok_or_else(|| "project does not exist".to_string())
}

fn milestone_json(index: usize, m: &StoredMilestone) -> Value {
    json!({
        "index": index,
        "description": m.description,
        "targetAmount": m.target.to_string(),
        "raisedAmount": m.raised.to_string(),
        "isCompleted": m.raised >= m.target,
    })
}

fn read_contract(contract: &Contract, method: &str, args: &[Value]) -> Result<Value, Revert> {
    match method {
        methods::GET_PROJECT => {
            let id = arg_uint(args, 0)?;
            Ok(contract
                .projects
                .get(id as usize)
                .map(|p| p.to_json(id))
                .unwrap_or(Value::Null))
        }
        methods::GET_MILESTONE => {
            let project = project_ref(contract, arg_uint(args, 0)?)?;
            let index = arg_uint(args, 1)? as usize;
            let m = project
                .milestones
                .get(index)
                .ok_or_else(|| "milestone does not exist".to_string())?;
            Ok(milestone_json(index, m))
        }
        methods::GET_MILESTONE_DONATIONS => {
            let project = project_ref(contract, arg_uint(args, 0)?)?;
            let index = arg_uint(args, 1)? as usize;
            let donor = arg_address(args, 2)?;
            let m = project
                .milestones
                .get(index)
                .ok_or_else(|| "milestone does not exist".to_string())?;
            let total = m.donations.get(&donor).copied().unwrap_or_default();
            Ok(json!(total.to_string()))
        }
        methods::GET_PROJECT_DONATIONS => {
            let project = project_ref(contract, arg_uint(args, 0)?)?;
            let donor = arg_address(args, 1)?;
            let total = project.donations.get(&donor).copied().unwrap_or_default();
            Ok(json!(total.to_string()))
        }
        methods::GET_PROJECTS => {
            let ps = &contract.projects;
            Ok(json!({
                "id": (0..ps.len()).collect::<Vec<_>>(),
                "name": ps.iter().map(|p| p.name.clone()).collect::<Vec<_>>(),
                "charityAddress": ps.iter().map(|p| p.owner.to_string()).collect::<Vec<_>>(),
                "goalAmount": ps.iter().map(|p| p.goal.to_string()).collect::<Vec<_>>(),
                "raisedAmount": ps.iter().map(|p| p.raised.to_string()).collect::<Vec<_>>(),
                "isActive": ps.iter().map(|p| p.is_active).collect::<Vec<_>>(),
                "milestoneCount": ps.iter().map(|p| p.milestones.len()).collect::<Vec<_>>(),
            }))
        }
        other => Err(format!("unknown method {}", other)),
    }
}

fn apply_write(
    contract: &mut Contract,
    tx: &TransactionRequest,
    enforce_caps: bool,
) -> Result<Option<ProjectId>, Revert> {
    match tx.method.as_str() {
        methods::CREATE_PROJECT => {
            let name = arg(&tx.args, 0)?
                .as_str()
                .ok_or("name must be a string")?
                .to_string();
            let goal = decode::amount(arg(&tx.args, 1)?, "goal").map_err(|e| e.to_string())?;
            let descriptions: Vec<String> =
                serde_json::from_value(arg(&tx.args, 2)?.clone()).map_err(|e| e.to_string())?;
            let targets = arg(&tx.args, 3)?
                .as_array()
                .ok_or("targets must be an array")?
                .iter()
                .map(|v| decode::amount(v, "target").map_err(|e| e.to_string()))
                .collect::<Result<Vec<_>, _>>()?;

            if goal.is_zero() {
                return Err("goal must be positive".into());
            }
            if descriptions.len() != targets.len() {
                return Err("milestone arrays differ in length".into());
            }
            let mut allocated = Amount::zero();
            for t in &targets {
                if t.is_zero() {
                    return Err("milestone target must be positive".into());
                }
                allocated = allocated.checked_add(*t).ok_or("overflow")?;
            }
            if allocated > goal {
                return Err("milestones exceed goal".into());
            }

            let id = contract.projects.len() as ProjectId;
            contract.projects.push(StoredProject {
                name,
                owner: tx.from,
                goal,
                raised: Amount::zero(),
                is_active: true,
                milestones: descriptions
                    .into_iter()
                    .zip(targets)
                    .map(|(description, target)| StoredMilestone {
                        description,
                        target,
                        raised: Amount::zero(),
                        donations: HashMap::new(),
                    })
                    .collect(),
                donations: HashMap::new(),
            });
            Ok(Some(id))
        }
        methods::DONATE => {
            let project = project_mut(contract, arg_uint(&tx.args, 0)?)?;
            let index = arg_uint(&tx.args, 1)? as usize;
            if !project.is_active {
                return Err("project is not active".into());
            }
            if tx.value.is_zero() {
                return Err("donation must be positive".into());
            }
            let milestone = project
                .milestones
                .get_mut(index)
                .ok_or("milestone does not exist")?;
            let new_raised = milestone.raised.checked_add(tx.value).ok_or("overflow")?;
            if enforce_caps && new_raised > milestone.target {
                return Err("donation exceeds milestone target".into());
            }
            milestone.raised = new_raised;
            *milestone.donations.entry(tx.from).or_default() += tx.value;
            project.raised = project.raised.checked_add(tx.value).ok_or("overflow")?;
            *project.donations.entry(tx.from).or_default() += tx.value;
            Ok(None)
        }
        methods::DEACTIVATE_PROJECT => {
            let project = project_mut(contract, arg_uint(&tx.args, 0)?)?;
            if project.owner != tx.from {
                return Err("caller is not the project owner".into());
            }
            if !project.is_active {
                return Err("project already inactive".into());
            }
            project.is_active = false;
            Ok(None)
        }
        other => Err(format!("unknown method {}", other)),
    }
}

#[async_trait]
impl LedgerTransport for InMemoryLedger {
    async fn call(
        &self,
        contract: &str,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, FundingError> {
        if Self::take_failure(&self.failing_calls) {
            return Err(FundingError::Unreachable("injected outage".to_string()));
        }

        let state = self.state.read();
        let stored = state
            .contracts
            .get(contract)
            .ok_or_else(|| {
                FundingError::StaleConfiguration(format!("no contract at {}", contract))
            })?;

        if let Some(injected) = state.injected.get(&injection_key(method, &args)) {
            return Ok(injected.clone());
        }

        read_contract(stored, method, &args).map_err(FundingError::Rejected)
    }

    async fn submit(&self, tx: TransactionRequest) -> Result<TxHash, FundingError> {
        if Self::take_failure(&self.failing_submits) {
            return Err(FundingError::Unreachable("injected outage".to_string()));
        }
        let enforce_caps = self.enforce_caps.load(Ordering::SeqCst);

        let mut state = self.state.write();
        state.nonce += 1;
        let nonce = state.nonce;
        let tx_hash = digest(&[
            tx.method.as_bytes(),
            tx.from.as_bytes(),
            &nonce.to_le_bytes(),
        ]);

        let contract = state
            .contracts
            .get_mut(&tx.contract)
            .ok_or_else(|| {
                FundingError::StaleConfiguration(format!("no contract at {}", tx.contract))
            })?;
        let outcome = apply_write(contract, &tx, enforce_caps);

        state.block_number += 1;
        let block = state.block_number;
        let receipt = match outcome {
            Ok(project_id) => {
                debug!("[cf-ledger] {} by {} applied in block {}", tx.method, tx.from, block);
                json!({
                    "txHash": format!("0x{}", hex::encode(tx_hash)),
                    "status": "success",
                    "blockNumber": block,
                    "projectId": project_id,
                })
            }
            Err(reason) => {
                debug!("[cf-ledger] {} by {} reverted: {}", tx.method, tx.from, reason);
                json!({
                    "txHash": format!("0x{}", hex::encode(tx_hash)),
                    "status": "reverted",
                    "reason": reason,
                    "blockNumber": block,
                })
            }
        };
        state.receipts.insert(tx_hash, receipt);
        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<Value, FundingError> {
        let delay = *self.confirmation_delay.read();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.state
            .read()
            .receipts
            .get(&tx_hash)
            .cloned()
            .ok_or_else(|| FundingError::Rejected("unknown transaction".to_string()))
    }

    async fn deploy(&self, from: Address) -> Result<String, FundingError> {
        let mut state = self.state.write();
        state.nonce += 1;
        let seed = digest(&[b"deploy", from.as_bytes(), &state.nonce.to_le_bytes()]);
        let address = format!("0x{}", hex::encode(&seed[..20]));
        state.contracts.insert(address.clone(), Contract::default());
        state.block_number += 1;
        info!("[cf-ledger] Platform contract deployed at {} by {}", address, from);
        Ok(address)
    }

    fn endpoint(&self) -> &str {
        "in-memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: Address = Address([1u8; 20]);
    const DONOR: Address = Address([2u8; 20]);

    fn tx(
        contract: &str,
        from: Address,
        method: &str,
        args: Vec<Value>,
        value: u64,
    ) -> TransactionRequest {
        TransactionRequest {
            contract: contract.to_string(),
            from,
            method: method.to_string(),
            args,
            value: Amount::from(value),
        }
    }

    async fn with_project(ledger: &InMemoryLedger) -> String {
        let contract = ledger.deploy(OWNER).await.unwrap();
        let hash = ledger
            .submit(tx(
                &contract,
                OWNER,
                methods::CREATE_PROJECT,
                vec![json!("Wells"), json!("100"), json!(["a", "b"]), json!(["40", "60"])],
                0,
            ))
            .await
            .unwrap();
        let receipt = ledger.wait_for_receipt(hash).await.unwrap();
        assert_eq!(receipt["status"], "success");
        assert_eq!(receipt["projectId"], 0);
        contract
    }

    #[tokio::test]
    async fn test_deploy_gives_distinct_addresses() {
        let ledger = InMemoryLedger::new();
        let a = ledger.deploy(OWNER).await.unwrap();
        let b = ledger.deploy(OWNER).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(a.len(), 42);
    }

    #[tokio::test]
    async fn test_donation_cap_enforced() {
        let ledger = InMemoryLedger::new();
        let contract = with_project(&ledger).await;

        let hash = ledger
            .submit(tx(&contract, DONOR, methods::DONATE, vec![json!(0), json!(0)], 41))
            .await
            .unwrap();
        let receipt = ledger.wait_for_receipt(hash).await.unwrap();
        assert_eq!(receipt["status"], "reverted");

        ledger.set_enforce_milestone_caps(false);
        let hash = ledger
            .submit(tx(&contract, DONOR, methods::DONATE, vec![json!(0), json!(0)], 41))
            .await
            .unwrap();
        let receipt = ledger.wait_for_receipt(hash).await.unwrap();
        assert_eq!(receipt["status"], "success");
    }

    #[tokio::test]
    async fn test_bulk_read_is_column_shaped() {
        let ledger = InMemoryLedger::new();
        let contract = with_project(&ledger).await;
        let cols = ledger.call(&contract, methods::GET_PROJECTS, vec![]).await.unwrap();
        assert_eq!(cols["name"][0], "Wells");
        assert_eq!(cols["milestoneCount"][0], 2);
    }

    #[tokio::test]
    async fn test_injected_response_overrides_state() {
        let ledger = InMemoryLedger::new();
        let contract = with_project(&ledger).await;
        ledger.inject_response(methods::GET_PROJECT, vec![json!(0)], json!({"bogus": true}));
        let raw = ledger
            .call(&contract, methods::GET_PROJECT, vec![json!(0)])
            .await
            .unwrap();
        assert_eq!(raw["bogus"], true);
    }

    #[tokio::test]
    async fn test_outage_counter() {
        let ledger = InMemoryLedger::new();
        let contract = ledger.deploy(OWNER).await.unwrap();
        ledger.fail_next_calls(1);
        assert!(ledger.call(&contract, methods::GET_PROJECTS, vec![]).await.is_err());
        assert!(ledger.call(&contract, methods::GET_PROJECTS, vec![]).await.is_ok());
    }
}
