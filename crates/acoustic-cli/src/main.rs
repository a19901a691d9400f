//!
//! CLI для акустических моделей: сводки, длины выхода и пробный прогон.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Instant;

use acoustic_core::{AcousticModel, ArchitectureKind, BorderMode, ModelConfig, cnn_output_length};
use acoustic_models::{AcousticNet, CtcGreedyDecoder, build_graph};
use candle_core::{DType, Tensor};
use candle_nn::{VarBuilder, VarMap};
use tracing::info;

#[derive(Parser)]
#[command(name = "acoustic")]
#[command(author, version, about = "Acoustic models for speech recognition (CNN + RNN + CTC)", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List supported architectures
    List,

    /// Print the layer table of an architecture
    Summary {
        /// Architecture (simple_rnn, rnn, cnn_rnn, deep_rnn, bidirectional_rnn,
        /// deeper_cnn_gru, deeper_cnn_gru_dropout, final)
        #[arg(long)]
        arch: Option<String>,

        /// config.json с гиперпараметрами (приоритетнее --arch)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Длина входа в фреймах для расчёта форм
        #[arg(long)]
        input_length: Option<usize>,

        /// Вывести сводку в JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Length of the output sequence after 1D convolutions along time.
    ///
    /// Либо явные параметры свёртки, либо `--arch`/`--config` для стадий модели.
    OutputLength {
        /// Input length in frames
        #[arg(long)]
        input_length: usize,

        /// Ширина ядра свёртки
        #[arg(long)]
        kernel_size: Option<usize>,

        /// Шаг свёртки
        #[arg(long, default_value_t = 1)]
        stride: usize,

        /// Режим границ: same | valid
        #[arg(long, default_value = "valid")]
        border_mode: String,

        /// Разрежение ядра
        #[arg(long, default_value_t = 1)]
        dilation: usize,

        /// Количество одинаковых свёрток подряд
        #[arg(long, default_value_t = 1)]
        layers: usize,

        /// Взять стадии из архитектуры
        #[arg(long)]
        arch: Option<String>,

        /// Взять стадии из config.json
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Run random features through a network
    Forward {
        /// Директория модели (config.json + model.safetensors)
        #[arg(long)]
        model: Option<PathBuf>,

        /// Архитектура со случайными весами (если --model не задан)
        #[arg(long)]
        arch: Option<String>,

        /// config.json для случайной инициализации
        #[arg(long)]
        config: Option<PathBuf>,

        /// Количество входных фреймов
        #[arg(long, default_value_t = 200)]
        frames: usize,

        /// Размер батча
        #[arg(long, default_value_t = 1)]
        batch: usize,

        /// Device to use (cpu, metal, cuda)
        #[arg(long, default_value = "cpu")]
        device: String,

        /// Декодировать выход CTC greedy-декодером
        #[arg(long, default_value_t = false)]
        decode: bool,
    },

    /// Run a simple test to verify the setup
    Test {
        /// Device to use (cpu, metal, cuda)
        #[arg(long, default_value = "cpu")]
        device: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List => {
            println!("Supported architectures:");
            for kind in ArchitectureKind::all() {
                let marker = if kind.is_convolutional() { "conv" } else { "    " };
                println!("  {:<24} {marker}  {}", kind.as_str(), kind.display_name());
            }
            Ok(())
        }

        Commands::Summary {
            arch,
            config,
            input_length,
            json,
        } => {
            let config = resolve_config(arch.as_deref(), config.as_deref())?;
            let graph = build_graph(&config.model_name, &config.architecture)?;
            let summary = graph.summary_with_length(input_length)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{summary}");
            }
            Ok(())
        }

        Commands::OutputLength {
            input_length,
            kernel_size,
            stride,
            border_mode,
            dilation,
            layers,
            arch,
            config,
        } => {
            let output = match kernel_size {
                Some(kernel_size) => {
                    let border_mode: BorderMode = border_mode.parse()?;
                    cnn_output_length(
                        Some(input_length),
                        kernel_size,
                        border_mode,
                        stride,
                        dilation,
                        layers,
                    )?
                }
                None => {
                    let config = resolve_config(arch.as_deref(), config.as_deref())?;
                    let graph = build_graph(&config.model_name, &config.architecture)?;
                    graph.output_length(Some(input_length))?
                }
            };
            match output {
                Some(len) => println!("{input_length} → {len}"),
                None => println!("{input_length} → None"),
            }
            Ok(())
        }

        Commands::Forward {
            model,
            arch,
            config,
            frames,
            batch,
            device,
            decode,
        } => {
            let device = create_device(&device)?;

            let net = match model {
                Some(dir) => AcousticNet::load(&dir, &device)
                    .with_context(|| format!("не удалось загрузить модель из {}", dir.display()))?,
                None => {
                    let config = resolve_config(arch.as_deref(), config.as_deref())?;
                    info!("{}: случайная инициализация весов", config.model_name);
                    let varmap = VarMap::new();
                    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
                    AcousticNet::from_var_builder(config, vb)?
                }
            };

            let features = Tensor::randn(0f32, 1f32, (batch, frames, net.input_dim()), &device)?;
            let start = Instant::now();
            let probs = net.forward(&features)?;
            let elapsed = start.elapsed();

            println!("Model: {} ({})", net.name(), net.architecture());
            println!("Input:  {:?}", features.dims());
            println!("Output: {:?}", probs.dims());
            println!(
                "output_length({frames}) = {:?}",
                net.output_length(Some(frames))?
            );
            println!("Forward: {:.3}s", elapsed.as_secs_f64());

            if decode {
                let decoder = CtcGreedyDecoder::default();
                for (i, text) in decoder.decode_batch(&probs, None)?.iter().enumerate() {
                    println!("[{i}] {text:?}");
                }
            }
            Ok(())
        }

        Commands::Test { device } => {
            println!("Acoustic models - Setup Test");
            println!("============================");
            println!("Testing {device} device...");
            let device = create_device(&device)?;

            let a = Tensor::randn(0f32, 1f32, (2, 3), &device)?;
            let b = Tensor::randn(0f32, 1f32, (3, 4), &device)?;
            let c = a.matmul(&b)?;
            println!("Test passed. Output shape: {:?}", c.dims());
            Ok(())
        }
    }
}

/// Конфигурация из файла, по имени архитектуры или `final` по умолчанию.
fn resolve_config(arch: Option<&str>, config: Option<&Path>) -> Result<ModelConfig> {
    if let Some(path) = config {
        return ModelConfig::from_file(path)
            .with_context(|| format!("не удалось прочитать {}", path.display()));
    }
    match arch {
        Some(name) => {
            let kind = ArchitectureKind::from_str_loose(name).ok_or_else(|| {
                anyhow::anyhow!("неизвестная архитектура '{name}', см. `acoustic list`")
            })?;
            Ok(ModelConfig::preset(kind))
        }
        None => Ok(ModelConfig::default()),
    }
}

fn create_device(device: &str) -> Result<candle_core::Device> {
    match device {
        "metal" => {
            // candle может panic при инициализации Metal, если устройство недоступно.
            let prev_hook = std::panic::take_hook();
            std::panic::set_hook(Box::new(|_| {}));
            let res = std::panic::catch_unwind(|| candle_core::Device::new_metal(0));
            std::panic::set_hook(prev_hook);

            match res {
                Ok(Ok(dev)) => Ok(dev),
                Ok(Err(e)) => Err(e.into()),
                Err(_) => Err(anyhow::anyhow!(
                    "Инициализация Metal недоступна в этом окружении. Попробуйте --device cpu."
                )),
            }
        }
        "cuda" => Ok(candle_core::Device::new_cuda(0)?),
        _ => Ok(candle_core::Device::Cpu),
    }
}
