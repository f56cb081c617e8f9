use anyhow::{Context, Result};
use labforge_schemas::{
    experiment::ExperimentDefinition,
    file_formats::{ExperimentFile, SessionScript},
};
use std::{collections::BTreeMap, fs, path::Path};

/// Every experiment definition found in a directory of YAML files.
pub struct ExperimentLibrary {
    pub experiments: BTreeMap<String, ExperimentDefinition>,
}

impl ExperimentLibrary {
    /// Loads all experiment files from the specified directory.
    pub fn load(base_path: &str) -> Result<Self> {
        println!("Loading experiments from '{}'...", base_path);

        let experiments = load_yaml_files_into_map(
            Path::new(base_path),
            |file: ExperimentFile| file.experiments,
            |item: &ExperimentDefinition| item.experiment_id.clone(),
        )?;

        println!("Loaded {} experiment(s).", experiments.len());
        Ok(Self { experiments })
    }

    pub fn get(&self, experiment_id: &str) -> Result<&ExperimentDefinition> {
        self.experiments
            .get(experiment_id)
            .with_context(|| format!("Experiment '{}' is not in the library", experiment_id))
    }
}

pub fn load_script(path: &str) -> Result<SessionScript> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read script: {}", path))?;
    serde_yaml::from_str(&content).with_context(|| format!("Failed to parse YAML from {}", path))
}

/// Generic helper to load all YAML files in a directory into a map.
fn load_yaml_files_into_map<P, F, E, T, K>(
    dir_path: P,
    extract_vec: E,
    get_key: K,
) -> Result<BTreeMap<String, T>>
where
    P: AsRef<Path>,
    F: for<'de> serde::Deserialize<'de>, // The file wrapper struct (e.g., ExperimentFile)
    E: Fn(F) -> Vec<T>,                  // A closure to extract the Vec<T> from the wrapper
    K: Fn(&T) -> String,                 // A closure to get the key for the map from an item T
{
    let mut map = BTreeMap::new();
    for entry in fs::read_dir(dir_path.as_ref())
        .with_context(|| format!("Failed to read directory: {:?}", dir_path.as_ref()))?
    {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && path.extension().map_or(false, |s| s == "yaml" || s == "yml") {
            let content = fs::read_to_string(&path)?;
            let file_wrapper: F = serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML from {:?}", path))?;

            for item in extract_vec(file_wrapper) {
                map.insert(get_key(&item), item);
            }
        }
    }
    Ok(map)
}
