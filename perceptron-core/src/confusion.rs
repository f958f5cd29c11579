//! # Coletores de Estatísticas de Classificação
//!
//! Três acumuladores, todos combináveis entre execuções disjuntas:
//!
//! - [`Accuracy`]: acertos/erros para qualquer tarefa de classificação.
//! - [`BinaryConfusion`]: matriz de confusão 2×2 com precisão, revocação
//!   e F1, relativa a uma classe positiva ("hit") declarada.
//! - [`ConfusionMatrix`]: matriz multiclasse verdade × palpite.
//!
//! ## Sentinelas em vez de pânico
//!
//! Métricas sobre zero observações devolvem `NaN` (e o intervalo de
//! confiança devolve o limite trivial `(0, 1)`). Código de relatório
//! precisa continuar utilizável em execuções vazias.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfusionError;

/// $-qnorm(0.05 / 2)$: quantil normal para o intervalo de 95%.
const Z_95: f64 = 1.9599639845400538273879;

/// Intervalo de confiança binomial de 95% pelo método de Wilson.
///
/// O limite inferior é particularmente útil para ranquear sistemas: um
/// sistema só é "melhor" com confiança se seu limite inferior supera a
/// acurácia pontual do outro.
fn wilson_confint(phat: f64, n: usize) -> (f64, f64) {
    if n == 0 {
        return (0.0, 1.0);
    }
    let n = n as f64;
    let zsq = Z_95 * Z_95;
    let a1 = 1.0 / (1.0 + zsq / n);
    let a2 = phat + zsq / (2.0 * n);
    let a3 = Z_95 * (phat * (1.0 - phat) / n + zsq / (4.0 * n * n)).sqrt();
    (a1 * (a2 - a3), a1 * (a2 + a3))
}

/// Acurácia simples: contagem de acertos e erros.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accuracy {
    pub correct: usize,
    pub incorrect: usize,
}

impl Accuracy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra um desfecho já julgado.
    pub fn outcome(&mut self, is_hit: bool) {
        if is_hit {
            self.correct += 1;
        } else {
            self.incorrect += 1;
        }
    }

    /// Compara verdade e palpite e registra o desfecho.
    pub fn update<T: PartialEq + ?Sized>(&mut self, truth: &T, guess: &T) {
        self.outcome(truth == guess);
    }

    /// Registra pares (verdade, palpite) elemento a elemento.
    pub fn batch_update<T: PartialEq>(&mut self, truths: &[T], guesses: &[T]) {
        for (truth, guess) in truths.iter().zip(guesses) {
            self.update(truth, guess);
        }
    }

    /// Total de observações.
    pub fn len(&self) -> usize {
        self.correct + self.incorrect
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fração de acertos; `NaN` sem observações.
    pub fn accuracy(&self) -> f64 {
        if self.is_empty() {
            return f64::NAN;
        }
        self.correct as f64 / self.len() as f64
    }

    /// Intervalo de confiança de 95% (Wilson) para a acurácia.
    pub fn confint(&self) -> (f64, f64) {
        wilson_confint(self.accuracy(), self.len())
    }

    /// Combina dois coletores de execuções disjuntas. Sempre possível:
    /// acurácia não carrega metadado categórico.
    pub fn combine(&self, other: &Accuracy) -> Accuracy {
        Accuracy {
            correct: self.correct + other.correct,
            incorrect: self.incorrect + other.incorrect,
        }
    }
}

impl fmt::Display for Accuracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.accuracy())
    }
}

/// Matriz de confusão binária relativa a uma classe positiva declarada.
///
/// O campo `hit` diz qual rótulo conta como positivo; combinar matrizes
/// com `hit` divergentes é um erro, nunca uma fusão silenciosa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryConfusion {
    /// Rótulo tratado como positivo.
    pub hit: bool,
    pub tp: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
    pub tn: usize,
}

impl BinaryConfusion {
    pub fn new(hit: bool) -> Self {
        Self {
            hit,
            tp: 0,
            fp: 0,
            fn_: 0,
            tn: 0,
        }
    }

    /// Classifica o par (verdade, palpite) em uma das quatro células.
    pub fn update(&mut self, truth: bool, guess: bool) {
        match (truth == self.hit, guess == self.hit) {
            (true, true) => self.tp += 1,
            (false, true) => self.fp += 1,
            (true, false) => self.fn_ += 1,
            (false, false) => self.tn += 1,
        }
    }

    pub fn batch_update(&mut self, truths: &[bool], guesses: &[bool]) {
        for (&truth, &guess) in truths.iter().zip(guesses) {
            self.update(truth, guess);
        }
    }

    pub fn len(&self) -> usize {
        self.tp + self.fp + self.fn_ + self.tn
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fração de acertos; `NaN` sem observações.
    pub fn accuracy(&self) -> f64 {
        if self.is_empty() {
            return f64::NAN;
        }
        (self.tp + self.tn) as f64 / self.len() as f64
    }

    /// $tp / (tp + fp)$; `NaN` se nada foi previsto como positivo.
    pub fn precision(&self) -> f64 {
        let denom = self.tp + self.fp;
        if denom == 0 {
            return f64::NAN;
        }
        self.tp as f64 / denom as f64
    }

    /// $tp / (tp + fn)$; `NaN` se não há positivos na verdade.
    pub fn recall(&self) -> f64 {
        let denom = self.tp + self.fn_;
        if denom == 0 {
            return f64::NAN;
        }
        self.tp as f64 / denom as f64
    }

    /// Média harmônica de precisão e revocação, na forma
    /// $2tp / (2tp + fp + fn)$; `NaN` quando indefinida.
    pub fn f1(&self) -> f64 {
        let denom = 2 * self.tp + self.fp + self.fn_;
        if denom == 0 {
            return f64::NAN;
        }
        2.0 * self.tp as f64 / denom as f64
    }

    /// Intervalo de confiança de 95% (Wilson) para a acurácia.
    pub fn confint(&self) -> (f64, f64) {
        wilson_confint(self.accuracy(), self.len())
    }

    /// Soma campo a campo duas matrizes de execuções disjuntas.
    ///
    /// Falha com [`ConfusionError::HitMismatch`] quando as matrizes
    /// discordam sobre a classe positiva.
    pub fn combine(&self, other: &BinaryConfusion) -> Result<BinaryConfusion, ConfusionError> {
        if self.hit != other.hit {
            return Err(ConfusionError::HitMismatch {
                left: self.hit,
                right: other.hit,
            });
        }
        Ok(BinaryConfusion {
            hit: self.hit,
            tp: self.tp + other.tp,
            fp: self.fp + other.fp,
            fn_: self.fn_ + other.fn_,
            tn: self.tn + other.tn,
        })
    }
}

impl Default for BinaryConfusion {
    fn default() -> Self {
        Self::new(true)
    }
}

impl fmt::Display for BinaryConfusion {
    /// Tabela verdade × palpite no estilo do relatório clássico.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "verdade \\ palpite |{:>10} {:>10}", "pos", "neg")?;
        writeln!(f, "------------------+---------------------")?;
        writeln!(f, "              pos |{:>10} {:>10}", self.tp, self.fn_)?;
        write!(f, "              neg |{:>10} {:>10}", self.fp, self.tn)
    }
}

/// Matriz de confusão multiclasse: contagem por par (verdade, palpite).
///
/// Esparsa: só materializa os pares observados, então funciona para
/// conjuntos de classes de qualquer tamanho.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    matrix: HashMap<String, HashMap<String, usize>>,
    correct: usize,
    total: usize,
}

impl ConfusionMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, truth: &str, guess: &str) {
        *self
            .matrix
            .entry(truth.to_string())
            .or_default()
            .entry(guess.to_string())
            .or_insert(0) += 1;
        if truth == guess {
            self.correct += 1;
        }
        self.total += 1;
    }

    pub fn batch_update(&mut self, truths: &[String], guesses: &[String]) {
        for (truth, guess) in truths.iter().zip(guesses) {
            self.update(truth, guess);
        }
    }

    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Contagem da célula (verdade, palpite).
    pub fn count(&self, truth: &str, guess: &str) -> usize {
        self.matrix
            .get(truth)
            .and_then(|row| row.get(guess))
            .copied()
            .unwrap_or(0)
    }

    /// Fração de acertos; `NaN` sem observações.
    pub fn accuracy(&self) -> f64 {
        if self.is_empty() {
            return f64::NAN;
        }
        self.correct as f64 / self.total as f64
    }

    /// Precisão de uma classe: acertos dela sobre tudo que foi previsto
    /// como ela; `NaN` se a classe nunca foi prevista.
    pub fn precision(&self, class: &str) -> f64 {
        let predicted: usize = self.matrix.values().map(|row| row.get(class).copied().unwrap_or(0)).sum();
        if predicted == 0 {
            return f64::NAN;
        }
        self.count(class, class) as f64 / predicted as f64
    }

    /// Revocação de uma classe: acertos dela sobre suas ocorrências na
    /// verdade; `NaN` se a classe nunca ocorreu.
    pub fn recall(&self, class: &str) -> f64 {
        let occurred: usize = self.matrix.get(class).map(|row| row.values().sum()).unwrap_or(0);
        if occurred == 0 {
            return f64::NAN;
        }
        self.count(class, class) as f64 / occurred as f64
    }

    /// Rótulos observados (na verdade ou no palpite), em ordem fixa.
    pub fn labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self
            .matrix
            .iter()
            .flat_map(|(truth, row)| std::iter::once(truth.clone()).chain(row.keys().cloned()))
            .collect();
        labels.sort();
        labels.dedup();
        labels
    }

    /// Funde duas matrizes célula a célula. Não há metadado categórico a
    /// conferir, então a combinação é sempre possível.
    pub fn combine(&self, other: &ConfusionMatrix) -> ConfusionMatrix {
        let mut merged = self.clone();
        for (truth, row) in &other.matrix {
            let target = merged.matrix.entry(truth.clone()).or_default();
            for (guess, count) in row {
                *target.entry(guess.clone()).or_insert(0) += count;
            }
        }
        merged.correct += other.correct;
        merged.total += other.total;
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy_conta_e_formata() {
        let mut acc = Accuracy::new();
        acc.update("PT", "PT");
        acc.update("PT", "EN");
        acc.update("EN", "EN");
        acc.update("EN", "EN");
        assert_eq!(acc.len(), 4);
        assert_eq!(acc.accuracy(), 0.75);
        assert_eq!(format!("{acc}"), "0.7500");
    }

    #[test]
    fn test_accuracy_vazia_usa_sentinela() {
        let acc = Accuracy::new();
        assert!(acc.accuracy().is_nan());
        assert_eq!(acc.confint(), (0.0, 1.0));
    }

    #[test]
    fn test_confint_wilson_contem_proporcao() {
        let mut acc = Accuracy::new();
        for _ in 0..50 {
            acc.outcome(true);
        }
        for _ in 0..50 {
            acc.outcome(false);
        }
        let (lo, hi) = acc.confint();
        // para p̂ = 0.5 e n = 100, Wilson dá aproximadamente (0.404, 0.596)
        assert!(lo < 0.5 && 0.5 < hi);
        assert!(lo > 0.39 && hi < 0.61);
    }

    #[test]
    fn test_confusao_binaria_celulas() {
        let mut cm = BinaryConfusion::new(true);
        cm.update(true, true); // tp
        cm.update(false, true); // fp
        cm.update(true, false); // fn
        cm.update(false, false); // tn
        assert_eq!((cm.tp, cm.fp, cm.fn_, cm.tn), (1, 1, 1, 1));
        assert_eq!(cm.accuracy(), 0.5);
        assert_eq!(cm.precision(), 0.5);
        assert_eq!(cm.recall(), 0.5);
        assert_eq!(cm.f1(), 0.5);
    }

    #[test]
    fn test_combinacao_campo_a_campo() {
        let mut left = BinaryConfusion::new(true);
        left.update(true, true);
        left.update(false, true);
        let mut right = BinaryConfusion::new(true);
        right.update(true, false);
        right.update(false, false);
        let merged = left.combine(&right).unwrap();
        assert_eq!((merged.tp, merged.fp, merged.fn_, merged.tn), (1, 1, 1, 1));
    }

    #[test]
    fn test_combinacao_com_hit_divergente_falha() {
        let left = BinaryConfusion::new(true);
        let right = BinaryConfusion::new(false);
        assert_eq!(
            left.combine(&right),
            Err(ConfusionError::HitMismatch {
                left: true,
                right: false
            })
        );
    }

    #[test]
    fn test_metricas_vazias_nao_estouram() {
        let cm = BinaryConfusion::new(true);
        assert!(cm.accuracy().is_nan());
        assert!(cm.precision().is_nan());
        assert!(cm.recall().is_nan());
        assert!(cm.f1().is_nan());
        assert_eq!(cm.confint(), (0.0, 1.0));
    }

    #[test]
    fn test_matriz_multiclasse() {
        let mut cm = ConfusionMatrix::new();
        cm.update("N", "N");
        cm.update("N", "V");
        cm.update("V", "V");
        assert_eq!(cm.count("N", "V"), 1);
        assert_eq!(cm.accuracy(), 2.0 / 3.0);
        assert_eq!(cm.precision("V"), 0.5);
        assert_eq!(cm.recall("N"), 0.5);
        assert_eq!(cm.labels(), vec!["N".to_string(), "V".to_string()]);

        let merged = cm.combine(&cm);
        assert_eq!(merged.len(), 6);
        assert_eq!(merged.count("N", "N"), 2);
    }
}
