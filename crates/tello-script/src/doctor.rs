use anyhow::Result;

use crate::ScriptConfig;

pub fn check_script(cfg: &ScriptConfig) -> Result<()> {
    anyhow::ensure!(cfg.default_timeout_s >= 1, "script.default_timeout_s must be >= 1");
    anyhow::ensure!(cfg.default_timeout_s <= 300, "script.default_timeout_s should be <= 300");
    Ok(())
}
