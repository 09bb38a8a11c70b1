//! Plain-text weight persistence.
//!
//! RBM file layout, comma-delimited and newline-terminated:
//!
//! ```text
//! visible,hidden
//! w00,w01,...      (one line per visible unit, hidden values per line)
//! ...
//! ```
//!
//! A deep RBM file starts with one header line of `num_rbms,visible,hidden`
//! triples (one triple per layer, all joined by commas), followed by each
//! RBM's block in declared order — each block carries its own
//! `visible,hidden` pair, the outer header is not repeated.
//!
//! Values are written in `f64` `Display` form, which round-trips exactly.
//! There is no version field; format changes are breaking.
//!
//! IO and parse failures do not propagate: they are logged and the call
//! returns `false`/`None`, the sentinel callers must check.

use log::error;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::deep::{DeepRbm, RbmLayer};
use crate::matrix::Matrix;
use crate::rbm::Rbm;

/// Save a single RBM. Returns `false` (after logging) on failure.
pub fn save_rbm<M: Matrix>(rbm: &Rbm<M>, path: &Path) -> bool {
    match try_save(path, |w| write_rbm_block(rbm, w)) {
        Ok(()) => true,
        Err(e) => {
            error!("failed to save RBM to {}: {}", path.display(), e);
            false
        }
    }
}

/// Load a single RBM. Returns `None` (after logging) on failure.
pub fn load_rbm<M: Matrix>(path: &Path) -> Option<Rbm<M>> {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            error!("failed to read RBM from {}: {}", path.display(), e);
            return None;
        }
    };
    let lines: Vec<&str> = contents.lines().collect();
    match parse_rbm_block(&lines) {
        Ok(rbm) => Some(rbm),
        Err(e) => {
            error!("failed to parse RBM from {}: {}", path.display(), e);
            None
        }
    }
}

/// Save a deep RBM. Returns `false` (after logging) on failure.
pub fn save_deep_rbm<M: Matrix>(deep_rbm: &DeepRbm<M>, path: &Path) -> bool {
    match try_save(path, |w| write_deep_rbm(deep_rbm, w)) {
        Ok(()) => true,
        Err(e) => {
            error!("failed to save deep RBM to {}: {}", path.display(), e);
            false
        }
    }
}

/// Load a deep RBM. Returns `None` (after logging) on failure.
pub fn load_deep_rbm<M: Matrix>(path: &Path) -> Option<DeepRbm<M>> {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            error!("failed to read deep RBM from {}: {}", path.display(), e);
            return None;
        }
    };
    match parse_deep_rbm(&contents) {
        Ok(deep) => Some(deep),
        Err(e) => {
            error!("failed to parse deep RBM from {}: {}", path.display(), e);
            None
        }
    }
}

fn try_save(path: &Path, write: impl FnOnce(&mut dyn Write) -> io::Result<()>) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(fs::File::create(path)?);
    write(&mut writer)?;
    writer.flush()
}

fn write_rbm_block<M: Matrix>(rbm: &Rbm<M>, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{},{}", rbm.visible_size(), rbm.hidden_size())?;
    let weights = rbm.weights();
    for i in 0..rbm.visible_size() {
        let row: Vec<String> = (0..rbm.hidden_size())
            .map(|j| weights.get(i, j).to_string())
            .collect();
        writeln!(w, "{}", row.join(","))?;
    }
    Ok(())
}

fn write_deep_rbm<M: Matrix>(deep_rbm: &DeepRbm<M>, w: &mut dyn Write) -> io::Result<()> {
    let header: Vec<String> = deep_rbm
        .layers()
        .iter()
        .map(|layer| {
            format!(
                "{},{},{}",
                layer.size(),
                layer.rbm(0).visible_size(),
                layer.rbm(0).hidden_size()
            )
        })
        .collect();
    writeln!(w, "{}", header.join(","))?;

    for layer in deep_rbm.layers() {
        for rbm in layer.rbms() {
            write_rbm_block(rbm, w)?;
        }
    }
    Ok(())
}

fn parse_rbm_block<M: Matrix>(lines: &[&str]) -> Result<Rbm<M>, String> {
    let header = lines.first().ok_or("missing header line")?;
    let sizes = parse_ints(header)?;
    let [visible, hidden] = sizes[..] else {
        return Err(format!("header must be visible,hidden: {:?}", header));
    };

    if lines.len() < 1 + visible {
        return Err(format!(
            "expected {} weight rows, found {}",
            visible,
            lines.len() - 1
        ));
    }

    let mut rows = Vec::with_capacity(visible);
    for line in &lines[1..1 + visible] {
        let values = parse_floats(line)?;
        if values.len() != hidden {
            return Err(format!(
                "expected {} weights per row, found {}",
                hidden,
                values.len()
            ));
        }
        rows.push(values);
    }

    M::from_rows(&rows).map(Rbm::new).map_err(|e| e.to_string())
}

fn parse_deep_rbm<M: Matrix>(contents: &str) -> Result<DeepRbm<M>, String> {
    let lines: Vec<&str> = contents.lines().collect();
    let header = lines.first().ok_or("missing layer header line")?;
    let layer_info = parse_ints(header)?;
    if layer_info.is_empty() || layer_info.len() % 3 != 0 {
        return Err(format!(
            "layer header must hold num_rbms,visible,hidden triples, found {} values",
            layer_info.len()
        ));
    }

    let mut layers = Vec::with_capacity(layer_info.len() / 3);
    let mut start = 1;
    for triple in layer_info.chunks(3) {
        let (num_rbms, visible) = (triple[0], triple[1]);
        let block_len = 1 + visible;

        let mut rbms = Vec::with_capacity(num_rbms);
        for _ in 0..num_rbms {
            if lines.len() < start + block_len {
                return Err("file truncated mid layer".to_string());
            }
            rbms.push(parse_rbm_block(&lines[start..start + block_len])?);
            start += block_len;
        }
        layers.push(RbmLayer::new(rbms));
    }

    DeepRbm::new(layers).map_err(|e| e.to_string())
}

fn parse_ints(line: &str) -> Result<Vec<usize>, String> {
    line.split(',')
        .map(|v| {
            v.trim()
                .parse::<usize>()
                .map_err(|e| format!("bad integer {:?}: {}", v, e))
        })
        .collect()
}

fn parse_floats(line: &str) -> Result<Vec<f64>, String> {
    line.split(',')
        .map(|v| {
            v.trim()
                .parse::<f64>()
                .map_err(|e| format!("bad float {:?}: {}", v, e))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deep::LayerParameters;
    use crate::matrix::ImmutableMatrix;
    use crate::rbm::RandomRbmFactory;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join("rbm_persist_tests").join(name)
    }

    #[test]
    fn rbm_round_trip_is_exact() {
        let mut factory = RandomRbmFactory::seeded(13);
        let rbm = factory.build::<ImmutableMatrix>(5, 3);
        let path = temp_path("single.rbm");

        assert!(save_rbm(&rbm, &path));
        let loaded = load_rbm::<ImmutableMatrix>(&path).expect("load");

        assert_eq!(loaded.visible_size(), 5);
        assert_eq!(loaded.hidden_size(), 3);
        assert_eq!(loaded.weights(), rbm.weights());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn deep_rbm_round_trip_is_exact() {
        let mut factory = RandomRbmFactory::seeded(29);
        let deep = DeepRbm::from_layer_parameters(
            &[LayerParameters::new(3, 2, 2), LayerParameters::new(2, 3, 4)],
            &mut factory,
        )
        .unwrap();
        let path = temp_path("deep.rbm");

        assert!(save_deep_rbm::<ImmutableMatrix>(&deep, &path));
        let loaded = load_deep_rbm::<ImmutableMatrix>(&path).expect("load");

        assert_eq!(loaded.visible_size(), deep.visible_size());
        assert_eq!(loaded.hidden_size(), deep.hidden_size());
        assert_eq!(loaded.layers().len(), 2);
        for (a, b) in loaded.layers().iter().zip(deep.layers()) {
            assert_eq!(a.size(), b.size());
            for (ra, rb) in a.rbms().iter().zip(b.rbms()) {
                assert_eq!(ra.weights(), rb.weights());
            }
        }

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_file_yields_none() {
        assert!(load_rbm::<ImmutableMatrix>(Path::new("/nonexistent/model.rbm")).is_none());
        assert!(load_deep_rbm::<ImmutableMatrix>(Path::new("/nonexistent/deep.rbm")).is_none());
    }

    #[test]
    fn corrupt_contents_yield_none() {
        let path = temp_path("corrupt.rbm");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "2,2\n0.5,0.5\nnot,numbers\n").unwrap();
        assert!(load_rbm::<ImmutableMatrix>(&path).is_none());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn truncated_deep_file_yields_none() {
        let path = temp_path("truncated.rbm");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        // Header promises two RBMs, body holds one.
        fs::write(&path, "2,1,1\n1,1\n0.25\n").unwrap();
        assert!(load_deep_rbm::<ImmutableMatrix>(&path).is_none());
        let _ = fs::remove_file(&path);
    }
}
