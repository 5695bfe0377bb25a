//! Fine-tuned DistilBERT sequence classifier (Candle)
//!
//! Loads a Hugging Face export directory holding `config.json` (with the
//! `id2label` mapping written at training time), `tokenizer.json` or
//! `vocab.txt`, and `model.safetensors`.

use crate::artifact::ArtifactRef;
use crate::classifier::ScoringModel;
use crate::model_config::ModelConfig;
use candle_core::{DType, Device, IndexOp, Tensor, D};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::distilbert::{Config as DistilBertConfig, DistilBertModel};
use std::path::Path;
use tokenizers::{Tokenizer, TruncationParams};
use triage_core::{Error, LabelMapping, Result};

/// DistilBERT backbone with the `pre_classifier` / `classifier` head
pub struct DistilBertSequenceClassifier {
    name: String,
    tokenizer: Tokenizer,
    model: DistilBertModel,
    pre_classifier: Linear,
    classifier: Linear,
    device: Device,
    mapping: LabelMapping,
}

impl DistilBertSequenceClassifier {
    /// Load the fine-tuned model from a resolved artifact directory
    pub fn load(artifact: &ArtifactRef, config: &ModelConfig) -> Result<Self> {
        let model_path = artifact.location();
        let tokenizer = load_tokenizer(model_path, config.max_length)?;

        let config_path = artifact.file("config.json");
        let config_str = std::fs::read_to_string(&config_path)
            .map_err(|e| Error::load(format!("Failed to read config: {}", e)))?;
        let config_json: serde_json::Value = serde_json::from_str(&config_str)
            .map_err(|e| Error::load(format!("Failed to parse config JSON: {}", e)))?;

        let mapping = label_mapping(&config_json)?;
        let hidden_size = config_json
            .get("dim")
            .or_else(|| config_json.get("hidden_size"))
            .and_then(|v| v.as_u64())
            .unwrap_or(768) as usize;

        let distilbert_config: DistilBertConfig = serde_json::from_str(&config_str)
            .map_err(|e| Error::load(format!("Failed to parse config: {}", e)))?;

        let device = get_device(&config.device)?;
        let vb = load_var_builder(model_path, &device)?;

        let model = DistilBertModel::load(vb.pp("distilbert"), &distilbert_config)
            .map_err(|e| Error::load(format!("Failed to load DistilBERT model: {}", e)))?;

        let pre_classifier = candle_nn::linear(hidden_size, hidden_size, vb.pp("pre_classifier"))
            .map_err(|e| {
                Error::load(format!(
                    "pre_classifier layer missing or incompatible (hidden_size={}): {}",
                    hidden_size, e
                ))
            })?;

        let classifier = candle_nn::linear(hidden_size, mapping.labels().len(), vb.pp("classifier"))
            .map_err(|e| {
                Error::load(format!(
                    "Classification head missing or incompatible (artifact is not fine-tuned?): {}",
                    e
                ))
            })?;

        tracing::info!(
            "Successfully loaded DistilBERT classifier with labels {:?}",
            mapping.labels()
        );

        Ok(Self {
            name: artifact.name().to_string(),
            tokenizer,
            model,
            pre_classifier,
            classifier,
            device,
            mapping,
        })
    }

    fn logits(&self, text: &str) -> candle_core::Result<Tensor> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| candle_core::Error::Msg(format!("Tokenization failed: {}", e)))?;

        let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&x| x as i64).collect();
        let input_ids = Tensor::new(input_ids.as_slice(), &self.device)?.unsqueeze(0)?;

        // DistilBERT masks positions where the mask is non-zero
        let attention_mask_inverted: Vec<u8> = encoding
            .get_attention_mask()
            .iter()
            .map(|&x| if x == 0 { 1u8 } else { 0u8 })
            .collect();
        let attention_mask =
            Tensor::new(attention_mask_inverted.as_slice(), &self.device)?.unsqueeze(0)?;

        let hidden_states = self.model.forward(&input_ids, &attention_mask)?;
        let cls_embedding = hidden_states.i((0, 0, ..))?.unsqueeze(0)?;

        let pooled_output = self.pre_classifier.forward(&cls_embedding)?.relu()?;

        self.classifier.forward(&pooled_output)
    }
}

impl ScoringModel for DistilBertSequenceClassifier {
    fn score(&self, text: &str) -> Result<Vec<f32>> {
        let logits = self
            .logits(text)
            .map_err(|e| Error::inference(format!("Model forward pass failed: {}", e)))?;

        candle_nn::ops::softmax(&logits, D::Minus1)
            .and_then(|probs| probs.squeeze(0))
            .and_then(|probs| probs.to_vec1::<f32>())
            .map_err(|e| Error::inference(format!("Softmax failed: {}", e)))
    }

    fn labels(&self) -> &LabelMapping {
        &self.mapping
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Read the `id2label` table into a label mapping ordered by output index
fn label_mapping(config_json: &serde_json::Value) -> Result<LabelMapping> {
    let id2label = config_json
        .get("id2label")
        .and_then(|v| v.as_object())
        .ok_or_else(|| Error::load("config.json has no id2label mapping"))?;

    let mut entries = id2label
        .iter()
        .map(|(id, label)| {
            let index = id
                .parse::<usize>()
                .map_err(|_| Error::load(format!("id2label key '{}' is not an index", id)))?;
            let name = label
                .as_str()
                .ok_or_else(|| Error::load(format!("id2label[{}] is not a string", id)))?;
            Ok((index, name.to_string()))
        })
        .collect::<Result<Vec<_>>>()?;
    entries.sort_by_key(|(index, _)| *index);

    if entries.iter().enumerate().any(|(pos, (index, _))| pos != *index) {
        return Err(Error::load("id2label indices are not contiguous from 0"));
    }

    let names: Vec<String> = entries.into_iter().map(|(_, name)| name).collect();
    LabelMapping::from_names(&names)
}

fn get_device(device_str: &str) -> Result<Device> {
    match device_str.to_lowercase().as_str() {
        "cuda" | "cuda:0" => Device::new_cuda(0)
            .map_err(|e| Error::load(format!("Failed to initialize CUDA: {}", e))),
        "mps" | "metal" => Device::new_metal(0)
            .map_err(|e| Error::load(format!("Failed to initialize Metal: {}", e))),
        _ => Ok(Device::Cpu),
    }
}

fn load_var_builder(model_path: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let weights_path = model_path.join("model.safetensors");
    if !weights_path.exists() {
        return Err(Error::load(format!(
            "model.safetensors not found in {}",
            model_path.display()
        )));
    }

    // SAFETY: the weights file is treated as immutable for the process lifetime
    let vb = unsafe {
        VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, device)
            .map_err(|e| Error::load(format!("Failed to load weights: {}", e)))?
    };

    Ok(vb)
}

fn load_tokenizer(model_path: &Path, max_length: usize) -> Result<Tokenizer> {
    let mut tokenizer = read_tokenizer(model_path)?;
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            ..Default::default()
        }))
        .map_err(|e| Error::load(format!("Failed to configure truncation: {}", e)))?;
    tokenizer.with_padding(None);
    Ok(tokenizer)
}

fn read_tokenizer(model_path: &Path) -> Result<Tokenizer> {
    let tokenizer_json_path = model_path.join("tokenizer.json");
    if tokenizer_json_path.exists() {
        tracing::debug!("Loading tokenizer from tokenizer.json");
        return Tokenizer::from_file(&tokenizer_json_path)
            .map_err(|e| Error::load(format!("Failed to load tokenizer.json: {}", e)));
    }

    let vocab_path = model_path.join("vocab.txt");
    if vocab_path.exists() {
        tracing::debug!("Building tokenizer from vocab.txt");

        use tokenizers::models::wordpiece::WordPiece;
        use tokenizers::normalizers::BertNormalizer;
        use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
        use tokenizers::processors::bert::BertProcessing;

        let wordpiece = WordPiece::from_file(vocab_path.to_string_lossy().as_ref())
            .unk_token("[UNK]".to_string())
            .build()
            .map_err(|e| Error::load(format!("Failed to build WordPiece model: {}", e)))?;

        let mut tokenizer = Tokenizer::new(wordpiece);
        tokenizer.with_normalizer(Some(BertNormalizer::default()));
        tokenizer.with_pre_tokenizer(Some(BertPreTokenizer));

        let sep = ("[SEP]".to_string(), 102);
        let cls = ("[CLS]".to_string(), 101);
        tokenizer.with_post_processor(Some(BertProcessing::new(sep, cls)));

        return Ok(tokenizer);
    }

    Err(Error::load(format!(
        "No tokenizer found in {} (tried tokenizer.json, vocab.txt)",
        model_path.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model_config::{Architecture, EngineConfig};
    use crate::model_loader::ModelLoader;
    use candle_nn::VarMap;
    use serde_json::json;
    use tempfile::TempDir;
    use triage_core::Label;

    const DIM: usize = 8;

    /// Save a randomly initialised single-layer DistilBERT export
    fn write_tiny_artifact(dir: &Path, with_pre_classifier: bool) {
        let config = json!({
            "vocab_size": 124,
            "dim": DIM,
            "n_layers": 1,
            "n_heads": 2,
            "hidden_dim": 16,
            "activation": "gelu",
            "max_position_embeddings": 32,
            "initializer_range": 0.02,
            "pad_token_id": 0,
            "model_type": "distilbert",
            "id2label": {"0": "Billing", "1": "Technical", "2": "Other"}
        });
        std::fs::write(dir.join("config.json"), config.to_string()).unwrap();

        // [CLS]/[SEP] are fixed at 101/102 by the post-processor
        let mut vocab: Vec<String> = ["[PAD]", "[UNK]", "[CLS]", "[SEP]"]
            .iter()
            .map(|t| t.to_string())
            .collect();
        vocab.extend((0..120).map(|i| format!("w{}", i)));
        std::fs::write(dir.join("vocab.txt"), vocab.join("\n")).unwrap();

        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let distilbert_config: DistilBertConfig = serde_json::from_value(config).unwrap();
        DistilBertModel::load(vb.pp("distilbert"), &distilbert_config).unwrap();
        if with_pre_classifier {
            candle_nn::linear(DIM, DIM, vb.pp("pre_classifier")).unwrap();
        }
        candle_nn::linear(DIM, 3, vb.pp("classifier")).unwrap();
        varmap.save(dir.join("model.safetensors")).unwrap();
    }

    fn local_config(dir: &TempDir) -> ModelConfig {
        ModelConfig::from_local(dir.path(), Architecture::DistilBertSequenceClassification)
    }

    #[test]
    fn test_complete_head_loads_and_scores() {
        let dir = TempDir::new().unwrap();
        write_tiny_artifact(dir.path(), true);
        let config = local_config(&dir);
        let artifact = ArtifactRef::resolve(&config).unwrap();

        let model = DistilBertSequenceClassifier::load(&artifact, &config).unwrap();
        let scores = model.score("w5 w6").unwrap();
        assert_eq!(scores.len(), 3);
        assert!((scores.iter().sum::<f32>() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_missing_pre_classifier_is_load_error() {
        let dir = TempDir::new().unwrap();
        write_tiny_artifact(dir.path(), false);
        let config = local_config(&dir);
        let artifact = ArtifactRef::resolve(&config).unwrap();

        let err = DistilBertSequenceClassifier::load(&artifact, &config).err().unwrap();
        assert!(matches!(err, Error::Load(_)));
        assert!(err.to_string().contains("pre_classifier"));
    }

    #[test]
    fn test_missing_pre_classifier_loads_failed() {
        let dir = TempDir::new().unwrap();
        write_tiny_artifact(dir.path(), false);

        let state = ModelLoader::load(&local_config(&dir), &EngineConfig::default());
        let reason = state.failure_reason().expect("artifact without pre_classifier must fail");
        assert!(reason.contains("pre_classifier"), "unexpected reason: {}", reason);
    }

    #[test]
    fn test_label_mapping_follows_id2label_indices() {
        let config = json!({
            "id2label": {"2": "Other", "0": "Billing", "1": "Technical"}
        });
        let mapping = label_mapping(&config).unwrap();
        assert_eq!(mapping.labels(), &[Label::Billing, Label::Technical, Label::Other]);
    }

    #[test]
    fn test_label_mapping_rejects_untrained_labels() {
        let config = json!({
            "id2label": {"0": "LABEL_0", "1": "LABEL_1", "2": "LABEL_2"}
        });
        assert!(label_mapping(&config).is_err());
    }

    #[test]
    fn test_label_mapping_requires_contiguous_indices() {
        let config = json!({
            "id2label": {"0": "Billing", "1": "Technical", "5": "Other"}
        });
        assert!(label_mapping(&config).is_err());
    }

    #[test]
    fn test_missing_tokenizer_is_load_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = load_tokenizer(dir.path(), 128).err().unwrap();
        assert!(matches!(err, Error::Load(_)));
    }
}
