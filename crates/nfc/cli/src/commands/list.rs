use nfc_sdk::{Error, PcscSdk, SdkConfig};

/// Print the reader inventory; the context is released when `sdk` drops
pub(crate) fn list_command(config: SdkConfig) -> eyre::Result<()> {
    let sdk = PcscSdk::new(config);
    match sdk.init() {
        Ok(()) => {}
        Err(Error::NoReadersFound) => {
            println!("No readers found!");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    }

    println!("Available readers:");
    for reader in sdk.readers() {
        println!("{}. {}", reader.id(), reader.name());
    }

    Ok(())
}
