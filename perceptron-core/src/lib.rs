//! # perceptron-core — Classificadores Lineares da Família Perceptron
//!
//! Biblioteca de **aprendizado online** para classificação e rotulagem de
//! sequências (ex: POS tagging). O foco é um classificador treinável
//! pequeno e com poucas dependências, não um framework completo de ML.
//!
//! ## A família
//!
//! | Variante | Simples | Averaged |
//! |---|---|---|
//! | Binária | [`BinaryPerceptron`] | [`BinaryAveragedPerceptron`] |
//! | Multiclasse | [`Perceptron`] | [`AveragedPerceptron`] |
//! | Sequencial | [`SequencePerceptron`] | [`SequenceAveragedPerceptron`] |
//!
//! Todas são **mistake-driven**: processam um exemplo por vez e só tocam
//! nos pesos quando erram. As variantes *averaged* devolvem, ao final do
//! treino, a média temporal de todos os vetores de peso vistos — mais
//! estável que os pesos finais brutos — calculada por média preguiçosa
//! (ver [`weights`]) sem custo extra por passo.
//!
//! ## Representação de dados
//!
//! - **Feature**: chave opaca (`String`) de um sinal booleano; presença
//!   significa "disparou". Conjuntos de features são fatias esparsas já
//!   deduplicadas (semântica de conjunto).
//! - **Classe**: rótulo opaco (`String`; `bool` no caso binário). O
//!   conjunto de classes pode ser fixado na construção ou crescer
//!   conforme o treino observa rótulos novos.
//!
//! ## Exemplo de uso
//!
//! ```rust
//! use perceptron_core::AveragedPerceptron;
//!
//! let data = vec![
//!     ("N".to_string(), vec!["w=casa".to_string(), "sufixo=sa".to_string()]),
//!     ("V".to_string(), vec!["w=correu".to_string(), "sufixo=eu".to_string()]),
//! ];
//!
//! let mut model = AveragedPerceptron::new(42);
//! model.fit(&data, 5, 1.0).unwrap();
//!
//! assert_eq!(model.predict(&["w=correu".to_string()]), "V");
//! ```
//!
//! ## Módulos principais
//!
//! - [`weights`]: tabelas esparsas de pesos e a média preguiçosa.
//! - [`binary`], [`multiclass`], [`sequence`]: os seis classificadores.
//! - [`confusion`]: coletores de acurácia e matrizes de confusão.
//! - [`snapshot`]: persistência do estado completo do modelo.
//! - [`timer`]: cronômetro de escopo para instrumentar o treino.

pub mod binary;
pub mod confusion;
pub mod error;
pub mod multiclass;
pub mod sequence;
pub mod snapshot;
pub mod timer;
pub mod weights;

mod trainer;

pub use binary::{BinaryAveragedPerceptron, BinaryPerceptron};
pub use confusion::{Accuracy, BinaryConfusion, ConfusionMatrix};
pub use error::{ConfusionError, PerceptronError, SnapshotError};
pub use multiclass::{AveragedPerceptron, Perceptron};
pub use sequence::{SequenceAveragedPerceptron, SequencePerceptron, TaggedSequence};
pub use snapshot::{AveragingState, ModelSnapshot, WeightRecord};
pub use timer::Timer;
