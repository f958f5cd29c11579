//! # Erros da Biblioteca
//!
//! Todas as condições de falha são violações de contrato do chamador ou
//! dados persistidos malformados. Predição com features ou classes
//! desconhecidas **nunca** é erro: peso ausente vale zero.

use thiserror::Error;

/// Erros de contrato do laço de treinamento.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PerceptronError {
    /// A taxa de aprendizado $\alpha$ deve estar no intervalo $(0, 1]$.
    /// Validada antes de qualquer atualização de peso (fail-fast).
    #[error("taxa de aprendizado fora de (0, 1]: {0}")]
    LearningRate(f64),
    /// O treinamento exige pelo menos uma época.
    #[error("número de épocas deve ser pelo menos 1")]
    Epochs,
}

/// Erros ao combinar coletores de estatísticas de execuções disjuntas.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfusionError {
    /// As duas matrizes discordam sobre qual classe conta como positiva.
    /// Combinar campo a campo seria silenciosamente errado.
    #[error("classes positivas incompatíveis: {left} vs {right}")]
    HitMismatch { left: bool, right: bool },
}

/// Erros ao reconstruir um modelo a partir de um [`crate::ModelSnapshot`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SnapshotError {
    /// Modelo averaged exige o estado de média (passos + flag de finalização).
    #[error("snapshot sem estado de média para um modelo averaged")]
    MissingAveraging,
    /// Modelo simples não sabe retomar um estado de média.
    #[error("snapshot traz estado de média para um modelo não-averaged")]
    UnexpectedAveraging,
    /// Modelos sequenciais precisam da janela de histórico de tags.
    #[error("snapshot de sequência sem a ordem do histórico de tags")]
    MissingOrder,
    /// Peso referindo uma classe fora do conjunto declarado no snapshot.
    #[error("peso para classe desconhecida: {0}")]
    UnknownClass(String),
    /// Registro com `last_step` à frente do relógio global da média;
    /// aceitá-lo faria a finalização subtrair além de zero.
    #[error("registro com last_step {last_step} além do total de {steps} passo(s)")]
    StepBeyondClock { last_step: usize, steps: usize },
}

/// Valida os parâmetros de `fit` antes de tocar em qualquer peso.
pub(crate) fn check_fit_params(alpha: f64, epochs: usize) -> Result<(), PerceptronError> {
    if !(alpha > 0.0 && alpha <= 1.0) {
        return Err(PerceptronError::LearningRate(alpha));
    }
    if epochs == 0 {
        return Err(PerceptronError::Epochs);
    }
    Ok(())
}
