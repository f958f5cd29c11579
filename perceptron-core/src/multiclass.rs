//! # Perceptron Multiclasse
//!
//! Generalização do perceptron binário para um conjunto aberto de
//! classes: cada par (feature, classe) tem um peso, e a predição é a
//! classe de maior score.
//!
//! ## Regra de atualização
//!
//! Quando o modelo erra, a classe verdadeira é promovida e a classe
//! predita é rebaixada, feature a feature:
//!
//! $$ w_{f,\,verdade} \leftarrow w_{f,\,verdade} + \alpha $$
//! $$ w_{f,\,palpite} \leftarrow w_{f,\,palpite} - \alpha $$
//!
//! As demais classes não são tocadas.
//!
//! ## Desempate determinístico
//!
//! As classes vivem em um `Vec` ordenado e a busca pelo argmax usa `>`
//! estrito, então o empate fica com a primeira classe na ordem fixa —
//! nunca com a ordem de iteração de um mapa, que mudaria entre execuções.

use serde::{Deserialize, Serialize};

use crate::error::PerceptronError;
use crate::trainer::run_epochs;
use crate::weights::{AveragedWeights, SparseWeights};

/// Perceptron multiclasse com vetores de features binárias esparsos.
///
/// O conjunto de classes pode ser fixado na construção
/// ([`Perceptron::with_classes`]) ou crescer dinamicamente conforme novos
/// rótulos aparecem no treino. Na prática, a estabilidade extra do
/// [`AveragedPerceptron`] quase sempre compensa; esta variante fica como
/// base e para comparação.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Perceptron {
    pub(crate) classes: Vec<String>,
    pub(crate) weights: SparseWeights<(String, String)>,
    pub(crate) seed: u64,
}

impl Perceptron {
    pub fn new(seed: u64) -> Self {
        Self {
            classes: Vec::new(),
            weights: SparseWeights::new(),
            seed,
        }
    }

    /// Constrói com um conjunto inicial de classes (ordenado e sem
    /// duplicatas, para desempate estável).
    pub fn with_classes(classes: &[&str], seed: u64) -> Self {
        let mut model = Self::new(seed);
        for class in classes {
            model.observe(class);
        }
        model
    }

    /// Classes conhecidas, na ordem fixa de desempate.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Registra uma classe, mantendo o `Vec` ordenado.
    pub(crate) fn observe(&mut self, class: &str) {
        if let Err(pos) = self.classes.binary_search_by(|c| c.as_str().cmp(class)) {
            self.classes.insert(pos, class.to_string());
        }
    }

    /// Score de uma classe para um conjunto de features ativas.
    /// Pares (feature, classe) nunca vistos valem 0.
    pub fn score(&self, class: &str, phi: &[String]) -> f64 {
        phi.iter()
            .map(|f| self.weights.get(&(f.clone(), class.to_string())))
            .sum()
    }

    /// Classe de maior score entre as conhecidas.
    ///
    /// Um modelo sem nenhuma classe observada devolve a string vazia —
    /// não há o que predizer.
    pub fn predict(&self, phi: &[String]) -> String {
        let mut best_class = String::new();
        let mut best_score = f64::NEG_INFINITY;
        for class in &self.classes {
            let score = self.score(class, phi);
            if score > best_score {
                best_score = score;
                best_class = class.clone();
            }
        }
        best_class
    }

    /// Um passo de aprendizado: observa o rótulo verdadeiro, prediz e,
    /// se errou, promove a verdade e rebaixa o palpite.
    ///
    /// Devolve a predição feita antes da atualização.
    ///
    /// `alpha` deve estar em $(0, 1]$: [`Perceptron::fit`] valida isso
    /// antes da primeira atualização, mas quem chama `fit_one`
    /// diretamente assume o contrato (aqui só há `debug_assert`).
    pub fn fit_one(&mut self, truth: &str, phi: &[String], alpha: f64) -> String {
        self.observe(truth);
        let guess = self.predict(phi);
        if guess != truth {
            self.update(truth, &guess, phi, alpha);
        }
        guess
    }

    pub(crate) fn update(&mut self, truth: &str, guess: &str, phi: &[String], alpha: f64) {
        debug_assert!(alpha > 0.0 && alpha <= 1.0);
        for feature in phi {
            self.weights.add((feature.clone(), truth.to_string()), alpha);
            self.weights.add((feature.clone(), guess.to_string()), -alpha);
        }
    }

    /// Treina por `epochs` passadas embaralhadas sobre os exemplos
    /// `(rótulo, features)`.
    pub fn fit(
        &mut self,
        data: &[(String, Vec<String>)],
        epochs: usize,
        alpha: f64,
    ) -> Result<(), PerceptronError> {
        let seed = self.seed;
        run_epochs(seed, data, epochs, alpha, |(truth, phi), accuracy| {
            let guess = self.fit_one(truth, phi, alpha);
            accuracy.update(truth.as_str(), guess.as_str());
        })?;
        self.finalize();
        Ok(())
    }

    pub fn finalize(&mut self) {}

    /// Peso bruto de um par (feature, classe).
    pub fn weight(&self, feature: &str, class: &str) -> f64 {
        self.weights.get(&(feature.to_string(), class.to_string()))
    }
}

/// Perceptron multiclasse com média temporal dos pesos.
///
/// Mesma regra de atualização do [`Perceptron`]; a diferença é que cada
/// peso carrega o estado de média preguiçosa e, após o
/// [`AveragedPerceptron::finalize`], as predições usam a média de todos
/// os valores mantidos durante o treino.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AveragedPerceptron {
    pub(crate) classes: Vec<String>,
    pub(crate) weights: AveragedWeights<(String, String)>,
    pub(crate) seed: u64,
}

impl AveragedPerceptron {
    pub fn new(seed: u64) -> Self {
        Self {
            classes: Vec::new(),
            weights: AveragedWeights::new(),
            seed,
        }
    }

    pub fn with_classes(classes: &[&str], seed: u64) -> Self {
        let mut model = Self::new(seed);
        for class in classes {
            model.observe(class);
        }
        model
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub(crate) fn observe(&mut self, class: &str) {
        if let Err(pos) = self.classes.binary_search_by(|c| c.as_str().cmp(class)) {
            self.classes.insert(pos, class.to_string());
        }
    }

    pub fn score(&self, class: &str, phi: &[String]) -> f64 {
        phi.iter()
            .map(|f| self.weights.get(&(f.clone(), class.to_string())))
            .sum()
    }

    pub fn predict(&self, phi: &[String]) -> String {
        let mut best_class = String::new();
        let mut best_score = f64::NEG_INFINITY;
        for class in &self.classes {
            let score = self.score(class, phi);
            if score > best_score {
                best_score = score;
                best_class = class.clone();
            }
        }
        best_class
    }

    /// Como [`Perceptron::fit_one`] (inclusive o contrato sobre `alpha`),
    /// com o relógio da média avançando a cada chamada, inclusive nos
    /// acertos.
    pub fn fit_one(&mut self, truth: &str, phi: &[String], alpha: f64) -> String {
        self.observe(truth);
        let guess = self.predict(phi);
        if guess != truth {
            self.update(truth, &guess, phi, alpha);
        }
        self.weights.tick();
        guess
    }

    pub(crate) fn update(&mut self, truth: &str, guess: &str, phi: &[String], alpha: f64) {
        debug_assert!(alpha > 0.0 && alpha <= 1.0);
        for feature in phi {
            self.weights.add((feature.clone(), truth.to_string()), alpha);
            self.weights.add((feature.clone(), guess.to_string()), -alpha);
        }
    }

    pub(crate) fn tick(&mut self) {
        self.weights.tick();
    }

    pub fn fit(
        &mut self,
        data: &[(String, Vec<String>)],
        epochs: usize,
        alpha: f64,
    ) -> Result<(), PerceptronError> {
        let seed = self.seed;
        run_epochs(seed, data, epochs, alpha, |(truth, phi), accuracy| {
            let guess = self.fit_one(truth, phi, alpha);
            accuracy.update(truth.as_str(), guess.as_str());
        })?;
        self.finalize();
        Ok(())
    }

    /// Troca os pesos brutos pelas médias. Idempotente.
    pub fn finalize(&mut self) {
        self.weights.finalize();
    }

    /// Média temporal do peso de um par (feature, classe).
    pub fn averaged_weight(&self, feature: &str, class: &str) -> f64 {
        self.weights
            .averaged(&(feature.to_string(), class.to_string()))
    }
}
