//! Поиск файлов модели (config.json и safetensors) на диске.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{AcousticError, AcousticResult};

/// Имя файла конфигурации в директории модели.
pub const CONFIG_FILE: &str = "config.json";

/// Имя нешардированного файла весов.
pub const WEIGHTS_FILE: &str = "model.safetensors";

/// Индекс шардированных весов (формат HF).
pub const WEIGHTS_INDEX_FILE: &str = "model.safetensors.index.json";

#[derive(serde::Deserialize)]
struct SafetensorsIndex {
    weight_map: HashMap<String, String>,
}

/// Путь к `config.json`, если файл существует.
pub fn find_config(model_dir: impl AsRef<Path>) -> Option<PathBuf> {
    let path = model_dir.as_ref().join(CONFIG_FILE);
    path.exists().then_some(path)
}

/// Разрешить список safetensors-файлов в директории модели.
///
/// Порядок поиска:
/// 1. `model.safetensors`
/// 2. `model.safetensors.index.json` → уникальные шарды из `weight_map`
/// 3. любые `*.safetensors` в директории (в лексикографическом порядке)
pub fn resolve_weight_files(model_dir: impl AsRef<Path>) -> AcousticResult<Vec<PathBuf>> {
    let model_dir = model_dir.as_ref();

    let single = model_dir.join(WEIGHTS_FILE);
    if single.exists() {
        return Ok(vec![single]);
    }

    let index_path = model_dir.join(WEIGHTS_INDEX_FILE);
    if index_path.exists() {
        let data = std::fs::read(&index_path)?;
        let index: SafetensorsIndex = serde_json::from_slice(&data)?;
        let shards: BTreeSet<&String> = index.weight_map.values().collect();

        let mut files = Vec::with_capacity(shards.len());
        for shard in shards {
            let path = model_dir.join(shard);
            if !path.exists() {
                return Err(AcousticError::Model(format!(
                    "Шард из {} не найден: {}",
                    WEIGHTS_INDEX_FILE,
                    path.display()
                )));
            }
            files.push(path);
        }
        if files.is_empty() {
            return Err(AcousticError::Model(format!(
                "Пустой weight_map в {}",
                index_path.display()
            )));
        }
        debug!("Веса разбиты на {} шардов", files.len());
        return Ok(files);
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(model_dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == "safetensors") {
            files.push(path);
        }
    }
    files.sort();
    if files.is_empty() {
        return Err(AcousticError::Model(format!(
            "В директории модели нет файлов весов (*.safetensors): {}",
            model_dir.display()
        )));
    }
    Ok(files)
}
