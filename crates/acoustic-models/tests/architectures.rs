//! Integration tests: every architecture built on random weights.

use std::path::PathBuf;

use acoustic_core::{
    AcousticError, AcousticModel, Activation, ArchitectureConfig, ArchitectureKind, BidirectionalRnnConfig,
    BorderMode, ConvRecurrentConfig, DeepRnnConfig, DropoutConvRecurrentConfig, ModelConfig,
    PoolingConfig, RnnConfig, SimpleRnnConfig,
};
use acoustic_models::AcousticNet;
use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};

const INPUT_DIM: usize = 13;

fn small_conv() -> ConvRecurrentConfig {
    ConvRecurrentConfig {
        input_dim: INPUT_DIM,
        filters: 6,
        kernel_size: 5,
        conv_stride: 2,
        conv_border_mode: BorderMode::Valid,
        units: 4,
        output_dim: 29,
    }
}

/// Уменьшенная конфигурация для каждой архитектуры.
fn small_config(kind: ArchitectureKind) -> ModelConfig {
    let architecture = match kind {
        ArchitectureKind::SimpleRnn => ArchitectureConfig::SimpleRnn(SimpleRnnConfig {
            input_dim: INPUT_DIM,
            output_dim: 29,
        }),
        ArchitectureKind::Rnn => ArchitectureConfig::Rnn(RnnConfig {
            input_dim: INPUT_DIM,
            units: 5,
            activation: Activation::Relu,
            output_dim: 29,
        }),
        ArchitectureKind::CnnRnn => ArchitectureConfig::CnnRnn(ConvRecurrentConfig {
            conv_border_mode: BorderMode::Same,
            ..small_conv()
        }),
        ArchitectureKind::DeepRnn => ArchitectureConfig::DeepRnn(DeepRnnConfig {
            input_dim: INPUT_DIM,
            units: 4,
            recur_layers: 2,
            output_dim: 29,
        }),
        ArchitectureKind::BidirectionalRnn => {
            ArchitectureConfig::BidirectionalRnn(BidirectionalRnnConfig {
                input_dim: INPUT_DIM,
                units: 4,
                output_dim: 29,
            })
        }
        ArchitectureKind::DeeperCnnGru => ArchitectureConfig::DeeperCnnGru(small_conv()),
        ArchitectureKind::DeeperCnnGruDropout => {
            ArchitectureConfig::DeeperCnnGruDropout(DropoutConvRecurrentConfig {
                conv: small_conv(),
                pooling: Some(PoolingConfig {
                    pool_size: 2,
                    pool_stride: 2,
                    pool_border_mode: BorderMode::Same,
                }),
                ..Default::default()
            })
        }
        ArchitectureKind::Final => ArchitectureConfig::Final(DropoutConvRecurrentConfig {
            conv: small_conv(),
            ..Default::default()
        }),
    };
    ModelConfig {
        model_name: format!("small-{}", kind.as_str()),
        architecture,
    }
}

fn random_net(config: ModelConfig) -> (AcousticNet, VarMap) {
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
    let net = AcousticNet::from_var_builder(config, vb).unwrap();
    (net, varmap)
}

fn features(batch: usize, time: usize) -> Tensor {
    Tensor::randn(0f32, 1f32, (batch, time, INPUT_DIM), &Device::Cpu).unwrap()
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("acoustic-models-{}-{name}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn test_every_architecture_matches_output_length() {
    for &kind in ArchitectureKind::all() {
        let (net, _varmap) = random_net(small_config(kind));
        assert_eq!(net.architecture(), kind);

        let time = 21;
        let expected = net.output_length(Some(time)).unwrap().unwrap();
        let out = net.forward(&features(2, time)).unwrap();
        assert_eq!(out.dims(), &[2, expected, 29], "{kind:?}");

        let sums: Vec<f32> = out.sum(2).unwrap().flatten_all().unwrap().to_vec1().unwrap();
        for s in sums {
            assert!((s - 1.0).abs() < 1e-4, "{kind:?}: softmax row sums to {s}");
        }
    }
}

#[test]
fn test_convolutional_lengths() {
    let (net, _) = random_net(small_config(ArchitectureKind::Final));
    // valid, kernel 5, stride 2: ceil((21 - 5 + 1) / 2) = 9
    assert_eq!(net.output_length(Some(21)).unwrap(), Some(9));
    assert_eq!(net.output_length(None).unwrap(), None);

    let (net, _) = random_net(small_config(ArchitectureKind::DeeperCnnGruDropout));
    // conv 21 → 9, pool(2, 2, same) → 5
    assert_eq!(net.output_length(Some(21)).unwrap(), Some(5));
    assert_eq!(net.forward(&features(1, 21)).unwrap().dims(), &[1, 5, 29]);
}

#[test]
fn test_inference_is_deterministic() {
    let (net, _) = random_net(small_config(ArchitectureKind::Final));
    let x = features(1, 15);
    let a: Vec<f32> = net.forward(&x).unwrap().flatten_all().unwrap().to_vec1().unwrap();
    let b: Vec<f32> = net.forward(&x).unwrap().flatten_all().unwrap().to_vec1().unwrap();
    assert_eq!(a, b);

    let trained = net.forward_t(&x, true).unwrap();
    assert_eq!(trained.dims(), &[1, 6, 29]);
}

#[test]
fn test_short_input_is_reported() {
    let (net, _) = random_net(small_config(ArchitectureKind::Final));

    // Ровно kernel - 1 фреймов → пустой выход
    let out = net.forward(&features(1, 4)).unwrap();
    assert_eq!(out.dims(), &[1, 0, 29]);

    match net.forward(&features(1, 3)) {
        Err(AcousticError::SequenceTooShort {
            input_length,
            required,
        }) => {
            assert_eq!(input_length, 3);
            assert_eq!(required, 4);
        }
        other => panic!("unexpected result: {:?}", other.map(|t| t.dims().to_vec())),
    }
}

#[test]
fn test_wrong_feature_dim_rejected() {
    let (net, _) = random_net(small_config(ArchitectureKind::Rnn));
    let x = Tensor::zeros((1, 10, INPUT_DIM + 1), DType::F32, &Device::Cpu).unwrap();
    assert!(matches!(net.forward(&x), Err(AcousticError::Inference(_))));
}

#[test]
fn test_summary_of_loaded_net() {
    let (net, _) = random_net(ModelConfig::default());
    let summary = net.summary();
    assert_eq!(summary.model_name, "final");
    assert_eq!(summary.total_params(), 2_359_629);
    assert_eq!(summary.non_trainable_params(), 2_800);
    assert_eq!(summary.layers[0].name, "the_input");
}

#[test]
fn test_save_and_load_roundtrip() {
    let config = small_config(ArchitectureKind::DeeperCnnGru);
    let (net, varmap) = random_net(config.clone());

    let dir = scratch_dir("roundtrip");
    varmap.save(dir.join("model.safetensors")).unwrap();
    std::fs::write(
        dir.join("config.json"),
        serde_json::to_string_pretty(&config).unwrap(),
    )
    .unwrap();

    let loaded = AcousticNet::load(&dir, &Device::Cpu).unwrap();
    assert_eq!(loaded.name(), config.model_name);
    assert_eq!(loaded.config(), &config);

    let x = features(1, 17);
    let a: Vec<f32> = net.forward(&x).unwrap().flatten_all().unwrap().to_vec1().unwrap();
    let b: Vec<f32> = loaded.forward(&x).unwrap().flatten_all().unwrap().to_vec1().unwrap();
    for (x, y) in a.iter().zip(&b) {
        assert!((x - y).abs() < 1e-6);
    }

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_load_without_weights_fails() {
    let dir = scratch_dir("empty");
    assert!(AcousticNet::load(&dir, &Device::Cpu).is_err());
    let _ = std::fs::remove_dir_all(&dir);
}
