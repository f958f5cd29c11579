//! # Perceptron Binário
//!
//! O classificador linear mais simples possível: um único vetor de pesos
//! esparso sobre features booleanas, decisão pelo sinal do score.
//!
//! O algoritmo é **online** e **mistake-driven**: processa um exemplo por
//! vez e só toca nos pesos quando erra. Proposto em:
//!
//! F. Rosenblatt. 1958. The perceptron: A probabilistic model for
//! information storage and organization in the brain. Psychological
//! Review 65(6): 386-408.
//!
//! ## Convenção de features
//!
//! Um vetor de features é um conjunto esparso de chaves ativas
//! (`&[String]`): presença significa "disparou", ausência significa "não
//! disparou". A semântica é de **conjunto** — chave repetida conta uma
//! vez, e o chamador passa a fatia já deduplicada.

use serde::{Deserialize, Serialize};

use crate::error::PerceptronError;
use crate::trainer::run_epochs;
use crate::weights::{AveragedWeights, SparseWeights};

/// Perceptron binário simples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinaryPerceptron {
    pub(crate) weights: SparseWeights<String>,
    pub(crate) seed: u64,
}

impl BinaryPerceptron {
    pub fn new(seed: u64) -> Self {
        Self {
            weights: SparseWeights::new(),
            seed,
        }
    }

    /// Soma dos pesos das features ativas. Feature desconhecida vale 0.
    pub fn score(&self, phi: &[String]) -> f64 {
        phi.iter().map(|f| self.weights.get(f.as_str())).sum()
    }

    /// Decisão binária: `true` sse o score é não-negativo.
    ///
    /// O empate (score exatamente 0) favorece a classe positiva — é por
    /// isso que um modelo recém-criado responde `true` para tudo.
    pub fn predict(&self, phi: &[String]) -> bool {
        self.score(phi) >= 0.0
    }

    /// Um passo de aprendizado: prediz e, se errou, recompensa (ou pune)
    /// cada feature ativa com `±alpha`.
    ///
    /// Devolve a predição feita **antes** da atualização, para que o
    /// chamador contabilize a acurácia do modelo corrente.
    ///
    /// `alpha` deve estar em $(0, 1]$: [`BinaryPerceptron::fit`] valida
    /// isso antes da primeira atualização, mas quem chama `fit_one`
    /// diretamente assume o contrato (aqui só há `debug_assert`).
    pub fn fit_one(&mut self, truth: bool, phi: &[String], alpha: f64) -> bool {
        let guess = self.predict(phi);
        if guess != truth {
            self.update(truth, phi, alpha);
        }
        guess
    }

    fn update(&mut self, truth: bool, phi: &[String], alpha: f64) {
        debug_assert!(alpha > 0.0 && alpha <= 1.0);
        let delta = if truth { alpha } else { -alpha };
        for feature in phi {
            self.weights.add(feature.clone(), delta);
        }
    }

    /// Treina por `epochs` passadas embaralhadas sobre os exemplos.
    pub fn fit(
        &mut self,
        data: &[(bool, Vec<String>)],
        epochs: usize,
        alpha: f64,
    ) -> Result<(), PerceptronError> {
        let seed = self.seed;
        run_epochs(seed, data, epochs, alpha, |(truth, phi), accuracy| {
            let guess = self.fit_one(*truth, phi, alpha);
            accuracy.update(truth, &guess);
        })?;
        self.finalize();
        Ok(())
    }

    /// Sem pós-processamento na variante simples.
    pub fn finalize(&mut self) {}

    /// Peso bruto de uma feature (0 se nunca atualizada).
    pub fn weight(&self, feature: &str) -> f64 {
        self.weights.get(feature)
    }
}

/// Perceptron binário com média temporal dos pesos.
///
/// Durante o treino as predições usam os pesos brutos; após
/// [`BinaryAveragedPerceptron::finalize`], cada peso passa a ser a média
/// de todos os valores que ele manteve ao longo dos passos — uma
/// regularização barata que estabiliza bastante o modelo final.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinaryAveragedPerceptron {
    pub(crate) weights: AveragedWeights<String>,
    pub(crate) seed: u64,
}

impl BinaryAveragedPerceptron {
    pub fn new(seed: u64) -> Self {
        Self {
            weights: AveragedWeights::new(),
            seed,
        }
    }

    pub fn score(&self, phi: &[String]) -> f64 {
        phi.iter().map(|f| self.weights.get(f.as_str())).sum()
    }

    pub fn predict(&self, phi: &[String]) -> bool {
        self.score(phi) >= 0.0
    }

    /// Como [`BinaryPerceptron::fit_one`] (inclusive o contrato sobre
    /// `alpha`), mas o relógio da média avança a cada chamada, **tenha ou
    /// não** havido atualização — passos quiescentes também pesam na
    /// média.
    pub fn fit_one(&mut self, truth: bool, phi: &[String], alpha: f64) -> bool {
        let guess = self.predict(phi);
        if guess != truth {
            debug_assert!(alpha > 0.0 && alpha <= 1.0);
            let delta = if truth { alpha } else { -alpha };
            for feature in phi {
                self.weights.add(feature.clone(), delta);
            }
        }
        self.weights.tick();
        guess
    }

    pub fn fit(
        &mut self,
        data: &[(bool, Vec<String>)],
        epochs: usize,
        alpha: f64,
    ) -> Result<(), PerceptronError> {
        let seed = self.seed;
        run_epochs(seed, data, epochs, alpha, |(truth, phi), accuracy| {
            let guess = self.fit_one(*truth, phi, alpha);
            accuracy.update(truth, &guess);
        })?;
        self.finalize();
        Ok(())
    }

    /// Troca os pesos brutos pelas médias temporais. Idempotente; chamada
    /// exatamente uma vez pelo [`BinaryAveragedPerceptron::fit`].
    pub fn finalize(&mut self) {
        self.weights.finalize();
    }

    /// Média temporal do peso de uma feature até o momento.
    pub fn averaged_weight(&self, feature: &str) -> f64 {
        self.weights.averaged(feature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feats(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    /// Traço fixo do cenário de referência: exemplos
    /// `[({a}, true), ({b}, false), ({a,b}, true)]` com α = 1.
    #[test]
    fn test_traco_binario_passo_a_passo() {
        let mut model = BinaryPerceptron::new(0);
        let a = feats(&["a"]);
        let b = feats(&["b"]);
        let ab = feats(&["a", "b"]);

        // exemplo 1: score 0 → prediz true, acerta, nenhum peso muda
        assert!(model.fit_one(true, &a, 1.0));
        assert_eq!(model.weight("a"), 0.0);

        // exemplo 2: score 0 → prediz true, erra → w[b] = -1
        assert!(model.fit_one(false, &b, 1.0));
        assert_eq!(model.weight("b"), -1.0);

        // exemplo 3: score -1 → prediz false, erra → w[a] = 1, w[b] = 0
        assert!(!model.fit_one(true, &ab, 1.0));
        assert_eq!(model.weight("a"), 1.0);
        assert_eq!(model.weight("b"), 0.0);
    }

    #[test]
    fn test_acerto_nao_altera_pesos() {
        let mut model = BinaryPerceptron::new(0);
        let phi = feats(&["x", "y"]);
        model.fit_one(true, &phi, 1.0); // score 0 → true, acerto
        assert_eq!(model.weight("x"), 0.0);
        assert_eq!(model.weight("y"), 0.0);
        assert!(model.weights.is_empty()); // nem entradas foram criadas
    }

    #[test]
    fn test_empate_favorece_classe_positiva() {
        let model = BinaryPerceptron::new(0);
        assert!(model.predict(&feats(&["qualquer"])));
    }

    #[test]
    fn test_convergencia_em_dados_separaveis() {
        let data = vec![
            (true, feats(&["bom"])),
            (true, feats(&["bom", "neutro"])),
            (false, feats(&["ruim"])),
            (false, feats(&["ruim", "neutro"])),
        ];
        let mut model = BinaryPerceptron::new(42);
        model.fit(&data, 10, 1.0).unwrap();
        for (truth, phi) in &data {
            assert_eq!(model.predict(phi), *truth);
        }
    }

    #[test]
    fn test_determinismo_com_semente_fixa() {
        let data = vec![
            (true, feats(&["a"])),
            (false, feats(&["b"])),
            (true, feats(&["a", "c"])),
            (false, feats(&["b", "c"])),
        ];
        let mut first = BinaryPerceptron::new(99);
        let mut second = BinaryPerceptron::new(99);
        first.fit(&data, 5, 1.0).unwrap();
        second.fit(&data, 5, 1.0).unwrap();
        for feature in ["a", "b", "c"] {
            assert_eq!(first.weight(feature), second.weight(feature));
        }
    }

    #[test]
    fn test_alpha_invalido_rejeitado_antes_de_atualizar() {
        let data = vec![(false, feats(&["a"]))];
        let mut model = BinaryPerceptron::new(0);
        assert!(model.fit(&data, 1, 2.0).is_err());
        // fail-fast: nenhum peso foi tocado
        assert_eq!(model.weight("a"), 0.0);
    }

    #[test]
    fn test_media_binaria_finaliza_uma_vez() {
        let data = vec![(true, feats(&["a"])), (false, feats(&["b"]))];
        let mut model = BinaryAveragedPerceptron::new(7);
        model.fit(&data, 3, 1.0).unwrap();
        let after_fit = model.averaged_weight("b");
        model.finalize(); // segunda finalização não conta nada em dobro
        assert_eq!(model.averaged_weight("b"), after_fit);
    }

    #[test]
    fn test_media_acompanha_pesos_constantes() {
        let mut model = BinaryAveragedPerceptron::new(0);
        let b = feats(&["b"]);
        // erra uma vez (w[b] = -1) e depois só acerta
        model.fit_one(false, &b, 1.0);
        model.fit_one(false, &b, 1.0);
        model.fit_one(false, &b, 1.0);
        model.finalize();
        // passo 0: -1; passos 1-2: -1 → média -1
        assert_eq!(model.averaged_weight("b"), -1.0);
        assert!(!model.predict(&b));
    }
}
