//! Конструкторы графов для всех поддерживаемых архитектур.
//!
//! Имена слоёв совпадают с именами слоёв Keras-моделей, поэтому веса,
//! экспортированные из обученных моделей, подхватываются без переименования.

use acoustic_core::{
    AcousticResult, Activation, ArchitectureConfig, ArchitectureKind, BidirectionalRnnConfig,
    ConvRecurrentConfig, DeepRnnConfig, DropoutConvRecurrentConfig, RnnConfig, SimpleRnnConfig,
    TemporalStage,
};

use crate::graph::{Graph, LayerKind, RecurrentSpec};

/// Построить граф по конфигурации архитектуры.
pub fn build_graph(name: &str, config: &ArchitectureConfig) -> AcousticResult<Graph> {
    config.validate()?;
    let mut graph = match config {
        ArchitectureConfig::SimpleRnn(c) => simple_rnn_model(c),
        ArchitectureConfig::Rnn(c) => rnn_model(c),
        ArchitectureConfig::CnnRnn(c) => cnn_rnn_model(c)?,
        ArchitectureConfig::DeepRnn(c) => deep_rnn_model(c),
        ArchitectureConfig::BidirectionalRnn(c) => bidirectional_rnn_model(c),
        ArchitectureConfig::DeeperCnnGru(c) => deeper_cnn_gru_model(c)?,
        ArchitectureConfig::DeeperCnnGruDropout(c) => deeper_cnn_gru_model_dropout(c)?,
        ArchitectureConfig::Final(c) => final_model(c)?,
    };
    graph.name = name.to_string();
    Ok(graph)
}

/// GRU(output_dim) `rnn` → softmax.
pub fn simple_rnn_model(c: &SimpleRnnConfig) -> Graph {
    let mut g = Graph::new("simple_rnn", ArchitectureKind::SimpleRnn, c.input_dim);
    g.push(
        "rnn",
        LayerKind::Recurrent(RecurrentSpec::gru(c.output_dim, Activation::Tanh)),
    )
    .push("softmax", LayerKind::Softmax);
    g
}

/// GRU `rnn` → BN `simp_rnn` → TimeDistributed(Dense) → softmax.
pub fn rnn_model(c: &RnnConfig) -> Graph {
    let mut g = Graph::new("rnn", ArchitectureKind::Rnn, c.input_dim);
    g.push("rnn", LayerKind::Recurrent(RecurrentSpec::gru(c.units, c.activation)))
        .push("simp_rnn", LayerKind::BatchNorm);
    push_head(&mut g, c.output_dim);
    g
}

/// Conv1D `conv1d` → BN → SimpleRNN `rnn` → BN `SRNN_BN` → Dense → softmax.
pub fn cnn_rnn_model(c: &ConvRecurrentConfig) -> AcousticResult<Graph> {
    let mut g = Graph::new("cnn_rnn", ArchitectureKind::CnnRnn, c.input_dim);
    push_conv_frontend(&mut g, c)?;
    g.push(
        "rnn",
        LayerKind::Recurrent(RecurrentSpec::simple_rnn(c.units, Activation::Relu)),
    )
    .push("SRNN_BN", LayerKind::BatchNorm);
    push_head(&mut g, c.output_dim);
    Ok(g)
}

/// `recur_layers` × (GRU `rnn{i}` → BN `SRNN_BN{i}`) → Dense → softmax.
pub fn deep_rnn_model(c: &DeepRnnConfig) -> Graph {
    let mut g = Graph::new("deep_rnn", ArchitectureKind::DeepRnn, c.input_dim);
    for i in 1..=c.recur_layers {
        g.push(
            &format!("rnn{i}"),
            LayerKind::Recurrent(RecurrentSpec::gru(c.units, Activation::Relu)),
        )
        .push(&format!("SRNN_BN{i}"), LayerKind::BatchNorm);
    }
    push_head(&mut g, c.output_dim);
    g
}

/// Bidirectional(GRU) `bidir` → Dense → softmax.
pub fn bidirectional_rnn_model(c: &BidirectionalRnnConfig) -> Graph {
    let mut g = Graph::new(
        "bidirectional_rnn",
        ArchitectureKind::BidirectionalRnn,
        c.input_dim,
    );
    g.push(
        "bidir",
        LayerKind::Bidirectional(RecurrentSpec::gru(c.units, Activation::Relu)),
    );
    push_head(&mut g, c.output_dim);
    g
}

/// Conv1D → BN → 3 × (Bidirectional(GRU) → BN) → Dense → softmax.
pub fn deeper_cnn_gru_model(c: &ConvRecurrentConfig) -> AcousticResult<Graph> {
    let mut g = Graph::new("deeper_cnn_gru", ArchitectureKind::DeeperCnnGru, c.input_dim);
    push_conv_frontend(&mut g, c)?;
    let spec = RecurrentSpec::gru(c.units, Activation::Relu);
    push_bidirectional_stack(&mut g, [spec; 3]);
    push_head(&mut g, c.output_dim);
    Ok(g)
}

/// Как [`deeper_cnn_gru_model`], но с dropout в GRU и опциональным пулингом.
pub fn deeper_cnn_gru_model_dropout(c: &DropoutConvRecurrentConfig) -> AcousticResult<Graph> {
    dropout_model(
        "deeper_cnn_gru_dropout",
        ArchitectureKind::DeeperCnnGruDropout,
        c,
    )
}

/// Итоговая модель; умолчания конфигурации: 161/200/13/2/valid/200/29.
pub fn final_model(c: &DropoutConvRecurrentConfig) -> AcousticResult<Graph> {
    dropout_model("final", ArchitectureKind::Final, c)
}

fn dropout_model(
    name: &str,
    kind: ArchitectureKind,
    c: &DropoutConvRecurrentConfig,
) -> AcousticResult<Graph> {
    let mut g = Graph::new(name, kind, c.conv.input_dim);
    push_conv_frontend(&mut g, &c.conv)?;
    if let Some(pool) = &c.pooling {
        let stage = TemporalStage::conv(pool.pool_size, pool.pool_stride, pool.pool_border_mode)?;
        g.push("max_pooling1d", LayerKind::MaxPool1d { stage });
    }

    // Входной dropout только у первого слоя, рекуррентный: у всех.
    let base = RecurrentSpec::gru(c.conv.units, Activation::Relu);
    push_bidirectional_stack(
        &mut g,
        [
            base.with_dropout(c.dropout, c.recurrent_dropout),
            base.with_dropout(0.0, c.recurrent_dropout),
            base.with_dropout(0.0, c.recurrent_dropout),
        ],
    );
    push_head(&mut g, c.conv.output_dim);
    Ok(g)
}

fn push_conv_frontend(g: &mut Graph, c: &ConvRecurrentConfig) -> AcousticResult<()> {
    let stage = TemporalStage::conv(c.kernel_size, c.conv_stride, c.conv_border_mode)?;
    g.push(
        "conv1d",
        LayerKind::Conv1d {
            filters: c.filters,
            stage,
            activation: Activation::Relu,
        },
    )
    .push("bn_conv_1d", LayerKind::BatchNorm);
    Ok(())
}

/// Три пары Bidirectional(GRU) → BN с именами `bidir*` / `SRNN_BN*`.
fn push_bidirectional_stack(g: &mut Graph, specs: [RecurrentSpec; 3]) {
    let bn_names = ["SRNN_BN", "SRNN_BN2", "SRNN_BN3"];
    for (spec, bn) in specs.into_iter().zip(bn_names) {
        g.push("bidir", LayerKind::Bidirectional(spec))
            .push(bn, LayerKind::BatchNorm);
    }
}

fn push_head(g: &mut Graph, output_dim: usize) {
    g.push("time_dense", LayerKind::TimeDistributedDense { units: output_dim })
        .push("softmax", LayerKind::Softmax);
}

#[cfg(test)]
mod tests {
    use acoustic_core::{BorderMode, PoolingConfig};

    use super::*;

    fn names(g: &Graph) -> Vec<&str> {
        g.layers.iter().map(|l| l.name.as_str()).collect()
    }

    #[test]
    fn test_final_model_layer_names() {
        let g = final_model(&DropoutConvRecurrentConfig::default()).unwrap();
        assert_eq!(
            names(&g),
            vec![
                "conv1d",
                "bn_conv_1d",
                "bidir",
                "SRNN_BN",
                "bidir2",
                "SRNN_BN2",
                "bidir3",
                "SRNN_BN3",
                "time_dense",
                "softmax",
            ]
        );
    }

    #[test]
    fn test_final_model_parameter_count() {
        let g = final_model(&DropoutConvRecurrentConfig::default()).unwrap();
        let summary = g.summary();
        assert_eq!(summary.total_params(), 2_359_629);
        assert_eq!(summary.non_trainable_params(), 2_800);
        assert_eq!(g.output_dim(), 29);
    }

    #[test]
    fn test_final_model_dropout_placement() {
        let g = final_model(&DropoutConvRecurrentConfig::default()).unwrap();
        let specs: Vec<RecurrentSpec> = g
            .layers
            .iter()
            .filter_map(|l| match &l.kind {
                LayerKind::Bidirectional(spec) => Some(*spec),
                _ => None,
            })
            .collect();
        assert_eq!(specs.len(), 3);
        assert_eq!(specs[0].dropout, 0.5);
        assert_eq!(specs[1].dropout, 0.0);
        assert_eq!(specs[2].dropout, 0.0);
        assert!(specs.iter().all(|s| s.recurrent_dropout == 0.1));
    }

    #[test]
    fn test_simple_rnn_parameter_count() {
        let g = simple_rnn_model(&SimpleRnnConfig {
            input_dim: 161,
            output_dim: 29,
        });
        assert_eq!(g.total_params(), 16_617);
        assert_eq!(g.output_length(Some(57)).unwrap(), Some(57));
    }

    #[test]
    fn test_deep_rnn_names() {
        let g = deep_rnn_model(&DeepRnnConfig {
            input_dim: 13,
            units: 8,
            recur_layers: 3,
            output_dim: 29,
        });
        assert_eq!(
            names(&g),
            vec![
                "rnn1",
                "SRNN_BN1",
                "rnn2",
                "SRNN_BN2",
                "rnn3",
                "SRNN_BN3",
                "time_dense",
                "softmax",
            ]
        );
    }

    #[test]
    fn test_cnn_rnn_output_length() {
        let c = ConvRecurrentConfig {
            kernel_size: 11,
            conv_stride: 2,
            conv_border_mode: BorderMode::Same,
            ..Default::default()
        };
        let g = cnn_rnn_model(&c).unwrap();
        assert_eq!(g.output_length(Some(101)).unwrap(), Some(51));
        assert_eq!(g.output_length(None).unwrap(), None);
    }

    #[test]
    fn test_pooling_folds_into_output_length() {
        let c = DropoutConvRecurrentConfig {
            pooling: Some(PoolingConfig {
                pool_size: 2,
                pool_stride: 2,
                pool_border_mode: BorderMode::Valid,
            }),
            ..Default::default()
        };
        let g = deeper_cnn_gru_model_dropout(&c).unwrap();
        // 100 → conv(13, 2, valid) → 44 → pool(2, 2, valid) → 22
        assert_eq!(g.output_length(Some(100)).unwrap(), Some(22));
        assert_eq!(g.layers[2].name, "max_pooling1d");
    }

    #[test]
    fn test_build_graph_rejects_zero_layers() {
        let config = ArchitectureConfig::DeepRnn(DeepRnnConfig {
            input_dim: 13,
            units: 8,
            recur_layers: 0,
            output_dim: 29,
        });
        assert!(build_graph("deep", &config).is_err());
    }

    #[test]
    fn test_every_preset_builds() {
        for &kind in ArchitectureKind::all() {
            let g = build_graph(kind.as_str(), &ArchitectureConfig::preset(kind)).unwrap();
            assert_eq!(g.architecture, kind);
            assert_eq!(g.output_dim(), 29);
            assert_eq!(g.layers.last().map(|l| l.name.as_str()), Some("softmax"));
        }
    }
}
