//! In-memory chain collaborator.
//!
//! `MockPtbClient` answers `read_function` from scripted responses, lists
//! owned objects from scripted pages and counts argument encodings. The
//! two registry lookups the expander makes are answered from per-token and
//! per-package tables so a test only describes chain state, not call order.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use serde_json::{json, Value as JsonValue};
use sui_ptb_composer::types::CallArg;
use sui_ptb_composer::{default_transform, CallContext, ObjectPage, PtbClient};

/// A pool registered for one coin metadata address.
#[derive(Debug, Clone)]
pub struct MockPool {
    pub package: String,
    pub state: String,
    pub module: String,
    pub token_type: String,
}

/// One `read_function` invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub package_id: String,
    pub module: String,
    pub function: String,
    pub args: Vec<JsonValue>,
    pub arg_types: Vec<String>,
}

#[derive(Default)]
pub struct MockPtbClient {
    responses: HashMap<String, JsonValue>,
    failures: HashSet<String>,
    pools: HashMap<String, MockPool>,
    registered_receivers: HashSet<String>,
    owned: HashMap<String, Vec<ObjectPage>>,
    delay: Option<Duration>,
    calls: Mutex<Vec<RecordedCall>>,
    transforms: AtomicUsize,
}

#[allow(dead_code)]
impl MockPtbClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `module::function` with `value`.
    pub fn with_response(mut self, module: &str, function: &str, value: JsonValue) -> Self {
        self.responses.insert(format!("{module}::{function}"), value);
        self
    }

    /// Make `module::function` fail.
    pub fn with_failure(mut self, module: &str, function: &str) -> Self {
        self.failures.insert(format!("{module}::{function}"));
        self
    }

    pub fn with_pool(mut self, coin_metadata: &str, pool: MockPool) -> Self {
        self.pools.insert(coin_metadata.to_string(), pool);
        self
    }

    pub fn with_registered_receiver(mut self, package: &str) -> Self {
        self.registered_receivers.insert(package.to_string());
        self
    }

    /// Objects owned by `owner`, one inner vec per page.
    pub fn with_owned_pages(mut self, owner: &str, pages: Vec<ObjectPage>) -> Self {
        self.owned.insert(owner.to_string(), pages);
        self
    }

    /// Delay every `read_function` answer.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, function: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.function == function)
            .count()
    }

    pub fn transform_count(&self) -> usize {
        self.transforms.load(Ordering::SeqCst)
    }

    fn pool_infos(&self, args: &[JsonValue]) -> Result<JsonValue> {
        let metadata = args
            .get(1)
            .and_then(JsonValue::as_array)
            .ok_or_else(|| anyhow!("get_pool_infos expects a list of coin metadata"))?;
        let mut package_ids = Vec::new();
        let mut states = Vec::new();
        let mut modules = Vec::new();
        let mut token_types = Vec::new();
        for entry in metadata {
            let key = entry.as_str().unwrap_or_default();
            let pool = self
                .pools
                .get(key)
                .ok_or_else(|| anyhow!("no pool registered for {}", key))?;
            package_ids.push(pool.package.clone());
            states.push(pool.state.clone());
            modules.push(pool.module.clone());
            token_types.push(pool.token_type.clone());
        }
        Ok(json!([{
            "token_pool_package_ids": package_ids,
            "token_pool_state_addresses": states,
            "token_pool_modules": modules,
            "token_types": token_types,
        }]))
    }
}

#[async_trait::async_trait]
impl PtbClient for MockPtbClient {
    async fn read_function(
        &self,
        _ctx: &CallContext,
        _signer: &str,
        package_id: &str,
        module: &str,
        function: &str,
        args: Vec<JsonValue>,
        arg_types: Vec<String>,
    ) -> Result<JsonValue> {
        self.calls.lock().unwrap().push(RecordedCall {
            package_id: package_id.to_string(),
            module: module.to_string(),
            function: function.to_string(),
            args: args.clone(),
            arg_types,
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let key = format!("{module}::{function}");
        if self.failures.contains(&key) {
            bail!("{} reverted", key);
        }
        match key.as_str() {
            "token_admin_registry::get_pool_infos" => self.pool_infos(&args),
            "receiver_registry::is_registered_receiver" => {
                let package = args.get(1).and_then(JsonValue::as_str).unwrap_or_default();
                Ok(json!([self.registered_receivers.contains(package)]))
            }
            _ => self
                .responses
                .get(&key)
                .cloned()
                .ok_or_else(|| anyhow!("no scripted response for {}", key)),
        }
    }

    async fn list_owned_objects(
        &self,
        _ctx: &CallContext,
        owner: &str,
        cursor: Option<String>,
    ) -> Result<ObjectPage> {
        let page: usize = cursor.map(|c| c.parse()).transpose()?.unwrap_or(0);
        Ok(self
            .owned
            .get(owner)
            .and_then(|pages| pages.get(page))
            .cloned()
            .unwrap_or_default())
    }

    async fn transform_argument(
        &self,
        _ctx: &CallContext,
        raw: &JsonValue,
        declared_type: &str,
        mutable: bool,
    ) -> Result<CallArg> {
        self.transforms.fetch_add(1, Ordering::SeqCst);
        default_transform(raw, declared_type, mutable)
    }
}
