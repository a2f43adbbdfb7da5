use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use nfc_sdk::SdkConfig;

/// Load controller settings: defaults, then the TOML file, then `NFC_*`
/// environment variables.
pub(crate) fn load_config(path: Option<&Path>) -> eyre::Result<SdkConfig> {
    let mut figment = Figment::new();
    if let Some(path) = path {
        if !path.exists() {
            eyre::bail!("config file {} not found", path.display());
        }
        figment = figment.merge(Toml::file(path));
    }

    Ok(figment
        .merge(Env::prefixed("NFC_").only(&["scope", "share_mode", "protocols", "disposition"]))
        .extract()?)
}

#[cfg(test)]
mod tests {
    use nfc_sdk::{Disposition, Protocols, Scope, ShareMode};

    use super::*;

    #[test]
    fn test_defaults_without_file() {
        figment::Jail::expect_with(|_| {
            let config = load_config(None).map_err(|e| e.to_string())?;
            assert_eq!(config, SdkConfig::default());
            Ok(())
        });
    }

    #[test]
    fn test_file_and_env() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("nfc.toml", "share_mode = \"shared\"\nprotocols = \"t1\"\n")?;
            jail.set_env("NFC_DISPOSITION", "leave");

            let config =
                load_config(Some(Path::new("nfc.toml"))).map_err(|e| e.to_string())?;
            assert_eq!(config.scope, Scope::System);
            assert_eq!(config.share_mode, ShareMode::Shared);
            assert_eq!(config.protocols, Protocols::T1);
            assert_eq!(config.disposition, Disposition::Leave);
            Ok(())
        });
    }

    #[test]
    fn test_missing_file() {
        assert!(load_config(Some(Path::new("/nonexistent/nfc.toml"))).is_err());
    }
}
