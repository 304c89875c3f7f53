use anyhow::Result;

use crate::LinkConfig;

pub fn check_link(cfg: &LinkConfig) -> Result<()> {
    anyhow::ensure!(!cfg.address.trim().is_empty(), "link.address missing");
    anyhow::ensure!(cfg.send_port != 0, "link.send_port must be set");
    anyhow::ensure!(
        cfg.receive_port == 0 || cfg.receive_port != cfg.send_port || !is_loopback(&cfg.address),
        "link.receive_port equals link.send_port on a local address"
    );
    Ok(())
}

fn is_loopback(address: &str) -> bool {
    address == "localhost" || address.parse::<std::net::IpAddr>().map(|ip| ip.is_loopback()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass() {
        check_link(&LinkConfig::default()).unwrap();
    }

    #[test]
    fn rejects_bad_values() {
        let mut cfg = LinkConfig::default();
        cfg.address = " ".into();
        assert!(check_link(&cfg).is_err());

        let mut cfg = LinkConfig::default();
        cfg.send_port = 0;
        assert!(check_link(&cfg).is_err());

        let cfg = LinkConfig { address: "127.0.0.1".into(), send_port: 8889, receive_port: 8889 };
        assert!(check_link(&cfg).is_err());
    }
}
