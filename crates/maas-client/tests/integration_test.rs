//! Integration tests for the MAAS client
//!
//! These tests require a running MAAS region.
//! Set MAAS_URL and MAAS_API_KEY environment variables to run.

use maas_client::{MaasClient, MaasClientTrait, DEFAULT_TIMEOUT};

fn client_from_env() -> MaasClient {
    let url = std::env::var("MAAS_URL")
        .unwrap_or_else(|_| "http://localhost:5240/MAAS/".to_string());
    let api_key = std::env::var("MAAS_API_KEY")
        .expect("MAAS_API_KEY environment variable must be set");

    MaasClient::new(url, &api_key, DEFAULT_TIMEOUT).expect("Failed to create client")
}

#[tokio::test]
#[ignore] // Requires running MAAS instance
async fn test_validate_credentials() {
    let client = client_from_env();
    client.validate_credentials().await.expect("Failed to validate API key");
}

#[tokio::test]
#[ignore]
async fn test_list_zones_includes_default() {
    let client = client_from_env();

    let zones = client.list_zones().await.expect("Failed to list zones");

    println!("Found {} zones", zones.len());
    assert!(zones.iter().any(|z| z.name == "default"), "MAAS always has a default zone");
}

#[tokio::test]
#[ignore]
async fn test_list_machines() {
    let client = client_from_env();

    let machines = client.list_machines().await.expect("Failed to list machines");

    println!("Found {} machines", machines.len());
}

#[tokio::test]
#[ignore]
async fn test_boot_source_selections() {
    let client = client_from_env();

    let sources = client.list_boot_sources().await.expect("Failed to list boot sources");
    for source in sources {
        let selections = client
            .list_boot_source_selections(source.id)
            .await
            .expect("Failed to list selections");
        println!("Boot source {} has {} selections", source.url, selections.len());
    }
}

#[tokio::test]
#[ignore]
async fn test_is_importing() {
    let client = client_from_env();

    let importing = client.is_importing().await.expect("Failed to query import state");

    println!("Importing: {}", importing);
}
