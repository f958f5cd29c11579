//! # Tabelas de Pesos Esparsas
//!
//! Os classificadores da família Perceptron operam sobre milhões de pares
//! (feature, classe), mas apenas uma fração minúscula deles recebe peso
//! diferente de zero. Este módulo define as duas representações usadas:
//!
//! - [`SparseWeights`]: mapa esparso com semântica de **zero-padrão** —
//!   ler uma chave ausente devolve `0.0` e nunca cria entrada; só a
//!   escrita insere.
//! - [`AveragedWeights`]: a mesma tabela, decorada com o estado necessário
//!   para a **média preguiçosa** (lazy averaging) do Averaged Perceptron.
//!
//! ## Média preguiçosa
//!
//! O Averaged Perceptron devolve, ao final do treino, a média temporal de
//! **todos** os vetores de peso vistos — inclusive nos passos em que o
//! peso ficou parado. Calcular isso de forma ingênua custaria
//! $O(\text{passos} \times |tabela|)$. Em vez disso, cada entrada guarda
//! `(current, total, last_step)` e, a cada escrita no passo $t$:
//!
//! ```text
//! total += current × (t − last_step)   // o peso ficou constante nesse intervalo
//! last_step = t
//! current += delta
//! ```
//!
//! Ao finalizar, uma única varredura leva todas as entradas até o passo
//! final e a média é `total / passos`. O resultado é idêntico à média
//! calculada passo a passo, com custo amortizado $O(1)$ por entrada
//! tocada.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

/// Mapa esparso chave → peso com leitura de zero-padrão.
///
/// Invariante: chave ausente tem peso 0 por definição. Leituras nunca
/// falham nem inserem; apenas [`SparseWeights::add`] cria entradas, e
/// entradas nunca são removidas.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SparseWeights<K: Eq + Hash> {
    map: HashMap<K, f64>,
}

impl<K: Eq + Hash> SparseWeights<K> {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Peso atual da chave; `0.0` se nunca foi escrita.
    pub fn get<Q>(&self, key: &Q) -> f64
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.map.get(key).copied().unwrap_or(0.0)
    }

    /// Soma `delta` ao peso da chave, criando a entrada se necessário.
    pub fn add(&mut self, key: K, delta: f64) {
        *self.map.entry(key).or_insert(0.0) += delta;
    }

    /// Número de entradas materializadas (não o tamanho do domínio!).
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Enumeração completa das entradas, em ordem arbitrária.
    pub fn iter(&self) -> impl Iterator<Item = (&K, f64)> {
        self.map.iter().map(|(k, w)| (k, *w))
    }
}

/// Estado de uma entrada sob média preguiçosa.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AveragedEntry {
    /// Peso bruto vigente (após finalizar, passa a ser a média).
    pub current: f64,
    /// Soma dos pesos mantidos em cada passo já "quitado".
    pub total: f64,
    /// Último passo em que `total` foi atualizado para esta entrada.
    pub last_step: usize,
}

impl AveragedEntry {
    /// Leva `total` até o passo `step`, contando o intervalo em que
    /// `current` ficou constante.
    fn settle(&mut self, step: usize) {
        self.total += self.current * (step - self.last_step) as f64;
        self.last_step = step;
    }
}

/// Tabela de pesos com média temporal preguiçosa.
///
/// O relógio global ([`AveragedWeights::tick`]) avança uma vez por exemplo
/// processado, **tenha ou não** havido atualização de peso — é isso que
/// mantém a ponderação temporal correta através de períodos quiescentes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AveragedWeights<K: Eq + Hash> {
    map: HashMap<K, AveragedEntry>,
    steps: usize,
    finalized: bool,
}

impl<K: Eq + Hash> AveragedWeights<K> {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
            steps: 0,
            finalized: false,
        }
    }

    /// Passos de treino já decorridos.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// `true` depois de [`AveragedWeights::finalize`].
    pub fn finalized(&self) -> bool {
        self.finalized
    }

    /// Peso bruto vigente (ou a média, após finalizar); `0.0` para chave
    /// nunca escrita.
    pub fn get<Q>(&self, key: &Q) -> f64
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.map.get(key).map(|e| e.current).unwrap_or(0.0)
    }

    /// Soma `delta` ao peso da chave no passo atual, quitando antes o
    /// intervalo quiescente da entrada.
    pub fn add(&mut self, key: K, delta: f64) {
        debug_assert!(!self.finalized, "atualização após finalize()");
        let entry = self.map.entry(key).or_default();
        entry.settle(self.steps);
        entry.current += delta;
    }

    /// Avança o relógio global em um passo.
    pub fn tick(&mut self) {
        self.steps += 1;
    }

    /// Média temporal do peso da chave até o momento.
    ///
    /// Definida como 0 antes de qualquer passo de treino (não há histórico
    /// sobre o qual tirar média — e evita divisão por zero).
    pub fn averaged<Q>(&self, key: &Q) -> f64
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        if self.steps == 0 {
            return 0.0;
        }
        match self.map.get(key) {
            Some(e) if self.finalized => e.current,
            Some(e) => {
                let total = e.total + e.current * (self.steps - e.last_step) as f64;
                total / self.steps as f64
            }
            None => 0.0,
        }
    }

    /// Fecha o treino: quita todas as entradas até o passo final e troca
    /// cada peso bruto pela sua média temporal.
    ///
    /// Idempotente: uma segunda chamada não conta nada em dobro.
    pub fn finalize(&mut self) {
        if self.finalized {
            return;
        }
        self.finalized = true;
        if self.steps == 0 {
            return;
        }
        let steps = self.steps;
        for entry in self.map.values_mut() {
            entry.settle(steps);
            entry.current = entry.total / steps as f64;
        }
    }

    /// Enumeração completa das entradas com seus metadados de média.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &AveragedEntry)> {
        self.map.iter()
    }

    /// Reconstrói a tabela a partir de um snapshot persistido.
    pub(crate) fn from_parts(
        entries: impl IntoIterator<Item = (K, AveragedEntry)>,
        steps: usize,
        finalized: bool,
    ) -> Self {
        Self {
            map: entries.into_iter().collect(),
            steps,
            finalized,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_leitura_nao_cria_entrada() {
        let table: SparseWeights<String> = SparseWeights::new();
        assert_eq!(table.get("inexistente"), 0.0);
        assert!(table.is_empty());
    }

    #[test]
    fn test_escrita_cria_e_acumula() {
        let mut table: SparseWeights<String> = SparseWeights::new();
        table.add("a".to_string(), 1.0);
        table.add("a".to_string(), 0.5);
        assert_eq!(table.get("a"), 1.5);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_media_zero_antes_de_qualquer_passo() {
        let table: AveragedWeights<String> = AveragedWeights::new();
        assert_eq!(table.averaged("x"), 0.0);
    }

    /// A média preguiçosa deve coincidir com a média ansiosa (snapshot do
    /// peso a cada passo) para qualquer sequência de atualizações.
    ///
    /// Deltas inteiros (±1) mantêm toda a aritmética exata em f64, então a
    /// comparação pode ser bit a bit.
    #[test]
    fn test_media_preguicosa_igual_media_ansiosa() {
        let mut rng = StdRng::seed_from_u64(7);
        let keys = ["a", "b", "c", "d"];
        let mut lazy: AveragedWeights<String> = AveragedWeights::new();
        let mut current: HashMap<&str, f64> = HashMap::new();
        let mut sums: HashMap<&str, f64> = HashMap::new();

        let n_steps = 250;
        for _ in 0..n_steps {
            // em cada passo, um subconjunto aleatório de chaves muda
            for key in keys {
                if rng.gen_bool(0.3) {
                    let delta = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
                    lazy.add(key.to_string(), delta);
                    *current.entry(key).or_insert(0.0) += delta;
                }
            }
            lazy.tick();
            // versão ansiosa: soma o peso vigente de TODAS as chaves
            for key in keys {
                *sums.entry(key).or_insert(0.0) += current.get(key).copied().unwrap_or(0.0);
            }
        }

        lazy.finalize();
        for key in keys {
            let eager = sums[key] / n_steps as f64;
            assert_eq!(lazy.averaged(key), eager, "chave {key}");
        }
    }

    #[test]
    fn test_finalize_idempotente() {
        let mut table: AveragedWeights<String> = AveragedWeights::new();
        table.add("a".to_string(), 2.0);
        table.tick();
        table.tick();
        table.finalize();
        let first = table.averaged("a");
        table.finalize();
        assert_eq!(table.averaged("a"), first);
        assert_eq!(first, 2.0); // peso 2 mantido pelos 2 passos
    }

    #[test]
    fn test_entrada_quiescente_conta_na_media() {
        let mut table: AveragedWeights<String> = AveragedWeights::new();
        // passo 0: peso vira 4
        table.add("a".to_string(), 4.0);
        table.tick();
        // passos 1..3: nada acontece com "a", mas o relógio anda
        table.tick();
        table.tick();
        table.tick();
        table.finalize();
        // peso 4 em todos os 4 passos
        assert_eq!(table.averaged("a"), 4.0);
    }

    #[test]
    fn test_media_consultavel_antes_de_finalizar() {
        let mut table: AveragedWeights<String> = AveragedWeights::new();
        table.add("a".to_string(), 3.0);
        table.tick(); // peso 3 no passo 0
        table.add("a".to_string(), 3.0);
        table.tick(); // peso 6 no passo 1
        // média parcial sem finalizar: (3 + 6) / 2
        assert_eq!(table.averaged("a"), 4.5);
        assert!(!table.finalized());
    }
}
