//! `injagent doctor` - active health diagnostics.
//!
//! Prints the resolved configuration, then probes the chain endpoints and
//! validates the signing setup to surface problems before they bite during
//! normal operation. Each check reports pass/fail with actionable guidance
//! on failures.

use std::sync::Arc;
use std::time::Duration;

use crate::chain::lcd::LcdClient;
use crate::chain::ChainRpc;
use crate::config::AgentConfig;
use crate::error::ChainResult;
use crate::identity::KeyedIdentity;
use crate::market::MarketResolver;
use crate::msg::MarketScope;

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Run diagnostic checks and print results.
pub async fn run(config: &AgentConfig, strict: bool) -> anyhow::Result<()> {
    println!("Injagent Doctor");
    println!("===============\n");

    print_resolved_config(config);

    let mut passed = 0u32;
    let mut failed = 0u32;

    let rpc: ChainResult<Arc<dyn ChainRpc>> =
        LcdClient::new(&config.network_config).map(|client| Arc::new(client) as _);

    check("Signing key", check_signing_key(config), &mut passed, &mut failed);

    check(
        "Chain reachability",
        check_chain_reachability(&rpc, &config.network_config.chain_id).await,
        &mut passed,
        &mut failed,
    );

    check(
        "Denom metadata",
        check_denom_metadata(&rpc).await,
        &mut passed,
        &mut failed,
    );

    check(
        "Market listings",
        check_market_listings(&rpc).await,
        &mut passed,
        &mut failed,
    );

    println!();
    println!("  {passed} passed, {failed} failed");

    if failed > 0 {
        println!("\n  Some checks failed. Transactions will not go through until they pass.");
        if strict {
            anyhow::bail!("doctor strict mode failed with {failed} check(s)");
        }
    }

    Ok(())
}

fn print_resolved_config(config: &AgentConfig) {
    let net = &config.network_config;
    println!("  network          {}", net.network.as_str());
    println!("  chain id         {}", net.chain_id);
    println!("  LCD              {}", net.lcd_endpoint);
    println!("  gRPC             {}", net.grpc_endpoint);
    println!("  gas price        {} {}", net.gas_price, net.fee_denom);
    println!("  gas buffer       {}", net.gas_buffer);
    println!("  timeout horizon  {} blocks", net.timeout_height_horizon);
    println!("  request timeout  {}s", net.request_timeout.as_secs());
    println!(
        "  private key      {}",
        if config.private_key.is_some() {
            "[set]"
        } else {
            "[missing]"
        }
    );
    println!();
}

// ── Individual checks ───────────────────────────────────────

fn check(name: &str, result: CheckResult, passed: &mut u32, failed: &mut u32) {
    match result {
        CheckResult::Pass(detail) => {
            *passed += 1;
            println!("  [pass] {name}: {detail}");
        }
        CheckResult::Fail(detail) => {
            *failed += 1;
            println!("  [FAIL] {name}: {detail}");
        }
        CheckResult::Skip(reason) => {
            println!("  [skip] {name}: {reason}");
        }
    }
}

enum CheckResult {
    Pass(String),
    Fail(String),
    Skip(String),
}

fn check_signing_key(config: &AgentConfig) -> CheckResult {
    let Some(key) = config.private_key.as_ref() else {
        return CheckResult::Skip(
            "INJECTIVE_PRIVATE_KEY not set; prepare and broadcast-signed still work".into(),
        );
    };

    match KeyedIdentity::from_hex(key) {
        Ok(identity) => CheckResult::Pass(format!("signs for {}", identity.address())),
        Err(e) => CheckResult::Fail(format!("key does not parse: {e}")),
    }
}

async fn check_chain_reachability(
    rpc: &ChainResult<Arc<dyn ChainRpc>>,
    chain_id: &str,
) -> CheckResult {
    let rpc = match rpc {
        Ok(rpc) => rpc,
        Err(e) => return CheckResult::Fail(format!("cannot construct LCD client: {e}")),
    };

    match tokio::time::timeout(PROBE_TIMEOUT, rpc.latest_block_height()).await {
        Ok(Ok(height)) => CheckResult::Pass(format!("{chain_id} at block {height}")),
        Ok(Err(e)) => CheckResult::Fail(format!("latest block query failed: {e}")),
        Err(_) => CheckResult::Fail(format!(
            "latest block query timed out after {}s",
            PROBE_TIMEOUT.as_secs()
        )),
    }
}

async fn check_denom_metadata(rpc: &ChainResult<Arc<dyn ChainRpc>>) -> CheckResult {
    let rpc = match rpc {
        Ok(rpc) => rpc,
        Err(e) => return CheckResult::Fail(format!("cannot construct LCD client: {e}")),
    };

    match tokio::time::timeout(PROBE_TIMEOUT, rpc.denom_decimals()).await {
        Ok(Ok(table)) => CheckResult::Pass(format!("decimals known for {} denoms", table.len())),
        Ok(Err(e)) => CheckResult::Fail(format!("denom metadata query failed: {e}")),
        Err(_) => CheckResult::Fail(format!(
            "denom metadata query timed out after {}s",
            PROBE_TIMEOUT.as_secs()
        )),
    }
}

async fn check_market_listings(rpc: &ChainResult<Arc<dyn ChainRpc>>) -> CheckResult {
    let rpc = match rpc {
        Ok(rpc) => rpc,
        Err(e) => return CheckResult::Fail(format!("cannot construct LCD client: {e}")),
    };
    // Goes through the resolver so the check sees exactly the table that
    // ticker resolution matches against.
    let resolver = MarketResolver::new(rpc.clone());

    let derivative = match tokio::time::timeout(
        PROBE_TIMEOUT,
        resolver.listing_table(MarketScope::Derivative),
    )
    .await
    {
        Ok(Ok(table)) => table.len(),
        Ok(Err(e)) => return CheckResult::Fail(format!("derivative market query failed: {e}")),
        Err(_) => return CheckResult::Fail("derivative market query timed out".into()),
    };
    let spot = match tokio::time::timeout(PROBE_TIMEOUT, resolver.listing_table(MarketScope::Spot))
        .await
    {
        Ok(Ok(table)) => table.len(),
        Ok(Err(e)) => return CheckResult::Fail(format!("spot market query failed: {e}")),
        Err(_) => return CheckResult::Fail("spot market query timed out".into()),
    };

    if derivative == 0 && spot == 0 {
        CheckResult::Fail("no markets listed; ticker resolution cannot work".into())
    } else {
        CheckResult::Pass(format!("{derivative} derivative, {spot} spot"))
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::*;
    use crate::config::{Network, NetworkConfig};

    fn config_with_key(key: Option<&str>) -> AgentConfig {
        AgentConfig {
            network_config: NetworkConfig::for_network(Network::Testnet),
            private_key: key.map(|k| SecretString::from(k.to_string())),
        }
    }

    #[test]
    fn missing_key_is_a_skip_not_a_failure() {
        match check_signing_key(&config_with_key(None)) {
            CheckResult::Skip(reason) => assert!(reason.contains("INJECTIVE_PRIVATE_KEY")),
            other => panic!("expected Skip, got: {}", format_result(&other)),
        }
    }

    #[test]
    fn valid_key_reports_the_signing_address() {
        let key = "0000000000000000000000000000000000000000000000000000000000000001";
        match check_signing_key(&config_with_key(Some(key))) {
            CheckResult::Pass(detail) => assert!(detail.contains("inj1")),
            other => panic!("expected Pass, got: {}", format_result(&other)),
        }
    }

    #[test]
    fn malformed_key_fails_the_check() {
        match check_signing_key(&config_with_key(Some("not hex"))) {
            CheckResult::Fail(_) => {}
            other => panic!("expected Fail, got: {}", format_result(&other)),
        }
    }

    fn format_result(r: &CheckResult) -> String {
        match r {
            CheckResult::Pass(s) => format!("Pass({s})"),
            CheckResult::Fail(s) => format!("Fail({s})"),
            CheckResult::Skip(s) => format!("Skip({s})"),
        }
    }
}
