//! # Perceptron para Rotulagem de Sequências
//!
//! Estende o perceptron multiclasse para tarefas como POS tagging, em que
//! a tag de um token depende das tags vizinhas.
//!
//! ## Decodificação gulosa (não é Viterbi!)
//!
//! A sequência é decodificada estritamente da esquerda para a direita e
//! nenhuma decisão é revista. Cada token é classificado com suas features
//! base **mais** features de histórico derivadas das tags já emitidas
//! (`prev_tag=...`, `prev2_tag=...`), até uma janela fixa `order`.
//!
//! É uma aproximação gulosa do score conjunto da sequência: troca a
//! otimalidade do Viterbi por decodificação em $O(n)$. Para janelas
//! pequenas e features locais fortes, a perda prática é pequena.
//!
//! ## Invariante de consistência treino/inferência
//!
//! Durante o treino, o histórico vem das tags **preditas** pela própria
//! decodificação gulosa — nunca das tags douradas. Assim o modelo aprende
//! sobre exatamente a mesma distribuição de features que verá na
//! inferência; usar o ouro aqui quebraria a correção do aprendizado, não
//! é uma escolha de otimização.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::PerceptronError;
use crate::multiclass::{AveragedPerceptron, Perceptron};
use crate::trainer::run_epochs;

/// Uma sequência de treino: tags douradas alinhadas com as features base
/// de cada token.
pub type TaggedSequence = (Vec<String>, Vec<Vec<String>>);

/// Features de histórico para o token `i`, derivadas das tags já
/// emitidas, da mais recente para a mais antiga.
fn history_features(order: usize, labels: &[String], i: usize) -> Vec<String> {
    (1..=order)
        .filter(|k| *k <= i)
        .map(|k| {
            let label = &labels[i - k];
            if k == 1 {
                format!("prev_tag={label}")
            } else {
                format!("prev{k}_tag={label}")
            }
        })
        .collect()
}

/// Tagger de sequências sobre um [`Perceptron`] multiclasse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequencePerceptron {
    pub(crate) model: Perceptron,
    /// Janela de histórico de tags (0 = sem features de histórico).
    pub(crate) order: usize,
}

impl SequencePerceptron {
    pub fn new(order: usize, seed: u64) -> Self {
        Self {
            model: Perceptron::new(seed),
            order,
        }
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn classes(&self) -> &[String] {
        self.model.classes()
    }

    /// Decodificação gulosa: devolve as tags emitidas e o conjunto de
    /// features **efetivo** (base + histórico) usado em cada posição —
    /// o treino precisa atualizar exatamente sobre essas features.
    fn decode(&self, phis: &[Vec<String>]) -> (Vec<String>, Vec<Vec<String>>) {
        let mut labels: Vec<String> = Vec::with_capacity(phis.len());
        let mut effective: Vec<Vec<String>> = Vec::with_capacity(phis.len());
        for (i, base) in phis.iter().enumerate() {
            let mut phi = base.clone();
            phi.extend(history_features(self.order, &labels, i));
            labels.push(self.model.predict(&phi));
            effective.push(phi);
        }
        (labels, effective)
    }

    /// Rotula uma sequência; mesma entrada e mesmo modelo produzem sempre
    /// a mesma saída, do mesmo comprimento da entrada.
    pub fn predict(&self, phis: &[Vec<String>]) -> Vec<String> {
        self.decode(phis).0
    }

    /// Rotula várias sequências independentes em paralelo.
    ///
    /// Só leitura sobre o modelo, então o paralelismo não interfere na
    /// semântica sequencial do treino.
    pub fn predict_batch(&self, sequences: &[Vec<Vec<String>>]) -> Vec<Vec<String>> {
        sequences.par_iter().map(|phis| self.predict(phis)).collect()
    }

    /// Um passo de aprendizado sobre a sequência inteira: decodifica com
    /// os pesos correntes e atualiza cada token errado, da esquerda para
    /// a direita, sobre as features efetivas da decodificação.
    ///
    /// Tags e features caminham pareadas; se as listas tiverem
    /// comprimentos diferentes, só os pares alinhados são supervisionados
    /// (a decodificação em si sempre cobre `phis` inteiro).
    ///
    /// Devolve as tags preditas (pré-atualização).
    pub fn fit_one(&mut self, truths: &[String], phis: &[Vec<String>], alpha: f64) -> Vec<String> {
        for truth in truths {
            self.model.observe(truth);
        }
        let (guesses, effective) = self.decode(phis);
        for ((guess, truth), phi) in guesses.iter().zip(truths).zip(&effective) {
            if guess != truth {
                self.model.update(truth, guess, phi, alpha);
            }
        }
        guesses
    }

    /// Treina por `epochs` passadas; o embaralhamento é por sequência
    /// (a ordem dos tokens dentro de cada sequência é estrutural e nunca
    /// muda), e a acurácia é contada por token.
    pub fn fit(
        &mut self,
        data: &[TaggedSequence],
        epochs: usize,
        alpha: f64,
    ) -> Result<(), PerceptronError> {
        let seed = self.model.seed;
        run_epochs(seed, data, epochs, alpha, |(truths, phis), accuracy| {
            let guesses = self.fit_one(truths, phis, alpha);
            accuracy.batch_update(truths, &guesses);
        })?;
        self.finalize();
        Ok(())
    }

    pub fn finalize(&mut self) {}
}

/// Tagger de sequências sobre um [`AveragedPerceptron`].
///
/// O relógio da média avança uma vez **por token**, tenha o token sido
/// acertado ou não.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceAveragedPerceptron {
    pub(crate) model: AveragedPerceptron,
    pub(crate) order: usize,
}

impl SequenceAveragedPerceptron {
    pub fn new(order: usize, seed: u64) -> Self {
        Self {
            model: AveragedPerceptron::new(seed),
            order,
        }
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn classes(&self) -> &[String] {
        self.model.classes()
    }

    fn decode(&self, phis: &[Vec<String>]) -> (Vec<String>, Vec<Vec<String>>) {
        let mut labels: Vec<String> = Vec::with_capacity(phis.len());
        let mut effective: Vec<Vec<String>> = Vec::with_capacity(phis.len());
        for (i, base) in phis.iter().enumerate() {
            let mut phi = base.clone();
            phi.extend(history_features(self.order, &labels, i));
            labels.push(self.model.predict(&phi));
            effective.push(phi);
        }
        (labels, effective)
    }

    pub fn predict(&self, phis: &[Vec<String>]) -> Vec<String> {
        self.decode(phis).0
    }

    pub fn predict_batch(&self, sequences: &[Vec<Vec<String>>]) -> Vec<Vec<String>> {
        sequences.par_iter().map(|phis| self.predict(phis)).collect()
    }

    /// Como [`SequencePerceptron::fit_one`]; o relógio da média avança
    /// uma vez por token supervisionado, acertado ou não.
    pub fn fit_one(&mut self, truths: &[String], phis: &[Vec<String>], alpha: f64) -> Vec<String> {
        for truth in truths {
            self.model.observe(truth);
        }
        let (guesses, effective) = self.decode(phis);
        for ((guess, truth), phi) in guesses.iter().zip(truths).zip(&effective) {
            if guess != truth {
                self.model.update(truth, guess, phi, alpha);
            }
            self.model.tick();
        }
        guesses
    }

    pub fn fit(
        &mut self,
        data: &[TaggedSequence],
        epochs: usize,
        alpha: f64,
    ) -> Result<(), PerceptronError> {
        let seed = self.model.seed;
        run_epochs(seed, data, epochs, alpha, |(truths, phis), accuracy| {
            let guesses = self.fit_one(truths, phis, alpha);
            accuracy.batch_update(truths, &guesses);
        })?;
        self.finalize();
        Ok(())
    }

    /// Troca os pesos brutos pelas médias. Idempotente; chamada
    /// exatamente uma vez pelo [`SequenceAveragedPerceptron::fit`].
    pub fn finalize(&mut self) {
        self.model.finalize();
    }
}
