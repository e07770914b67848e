use {
    anyhow::Result,
    ron::ser::{
        to_string_pretty,
        PrettyConfig,
    },
    serde::{
        de::DeserializeOwned,
        Serialize,
    },
    std::{
        fs,
        path::Path,
    },
};

/// Serialize a config struct into a pretty-printed RON file.
pub fn write_config<C: Serialize, P: AsRef<Path>>(
    config: &C,
    path: P,
) -> Result<()> {
    fs::write(path, to_string_pretty(config, PrettyConfig::default())?)?;
    Ok(())
}

/// Deserialize a config struct from a RON file written by [`write_config`].
pub fn read_config<C: DeserializeOwned, P: AsRef<Path>>(
    path: P,
) -> Result<C> {
    Ok(ron::from_str(&fs::read_to_string(path)?)?)
}
