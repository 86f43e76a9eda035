use crate::config::Config;
use crate::peer::ice::probe_ice_server;

pub async fn run(config: &Config) -> anyhow::Result<()> {
    if config.ice_servers.is_empty() {
        anyhow::bail!("no ICE servers configured");
    }

    let mut reachable = 0;
    for server in &config.ice_servers {
        let ok = probe_ice_server(server).await;
        println!(
            "{:<5} {:<40} {}",
            server.r#type,
            server.url,
            if ok { "ok" } else { "unreachable" }
        );
        if ok {
            reachable += 1;
        }
    }

    if reachable == 0 {
        anyhow::bail!("none of the {} servers answered", config.ice_servers.len());
    }
    Ok(())
}
