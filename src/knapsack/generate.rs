//! Random instance generation, written in `knapsack_standard` format.

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::info;

use super::instance::Instance;
use super::{KnapsackError, Profit, Weight};

/// The usual hardness classes: profits independent of weights, tied to
/// them within a band, or exactly offset (the hardest for bound-based
/// pruning). Subset-sum sets profit equal to weight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display, ValueEnum)]
#[strum(serialize_all = "kebab-case")]
pub enum InstanceClass {
    Uncorrelated,
    WeaklyCorrelated,
    StronglyCorrelated,
    SubsetSum,
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Seed for reproducible generation; random when omitted.
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Number of items.
    #[arg(short = 'n', long, default_value_t = 100)]
    pub item_number: usize,

    /// Knapsack capacity.
    #[arg(short, long, default_value_t = 1_000)]
    pub capacity: Weight,

    #[arg(long, default_value_t = 1)]
    pub min_weight: Weight,

    #[arg(long, default_value_t = 100)]
    pub max_weight: Weight,

    #[arg(long, value_enum, default_value_t = InstanceClass::Uncorrelated)]
    pub class: InstanceClass,

    /// Instance file to write; a `FORMAT.txt` is placed next to it.
    #[arg(short, long)]
    pub output: PathBuf,
}

impl GenerateArgs {
    pub fn generate(&self) -> Result<(), KnapsackError> {
        let mut rng = match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let ins = generate_instance(
            &mut rng,
            self.item_number,
            self.capacity,
            self.min_weight,
            self.max_weight,
            self.class,
        )?;
        ins.write(&self.output)?;
        if let Some(dir) = self.output.parent() {
            std::fs::write(dir.join("FORMAT.txt"), "knapsack_standard\n")?;
        }
        info!(
            n = self.item_number,
            c = self.capacity,
            class = ?self.class,
            path = %self.output.display(),
            "instance generated"
        );
        Ok(())
    }
}

pub fn generate_instance(
    rng: &mut ChaCha8Rng,
    n: usize,
    capacity: Weight,
    min_weight: Weight,
    max_weight: Weight,
    class: InstanceClass,
) -> Result<Instance, KnapsackError> {
    let mut ins = Instance::new(capacity);
    let band = (max_weight / 10).max(1);
    for _ in 0..n {
        let w = rng.gen_range(min_weight..=max_weight);
        let p: Profit = match class {
            InstanceClass::Uncorrelated => rng.gen_range(1..=max_weight),
            InstanceClass::WeaklyCorrelated => (w + rng.gen_range(-band..=band)).max(1),
            InstanceClass::StronglyCorrelated => w + band,
            InstanceClass::SubsetSum => w,
        };
        ins.add_item(w, p)?;
    }
    Ok(ins)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_instances_are_valid() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for class in [
            InstanceClass::Uncorrelated,
            InstanceClass::WeaklyCorrelated,
            InstanceClass::StronglyCorrelated,
            InstanceClass::SubsetSum,
        ] {
            let ins = generate_instance(&mut rng, 50, 500, 1, 60, class).unwrap();
            assert_eq!(ins.total_item_number(), 50);
            for pos in 0..50 {
                let it = ins.item(pos);
                assert!(it.w >= 1 && it.w <= 60);
                assert!(it.p >= 1);
                if class == InstanceClass::SubsetSum {
                    assert_eq!(it.p, it.w);
                }
            }
        }
    }

    #[test]
    fn seeded_generation_is_deterministic() {
        let mut a = ChaCha8Rng::seed_from_u64(9);
        let mut b = ChaCha8Rng::seed_from_u64(9);
        let x = generate_instance(&mut a, 20, 100, 1, 30, InstanceClass::Uncorrelated).unwrap();
        let y = generate_instance(&mut b, 20, 100, 1, 30, InstanceClass::Uncorrelated).unwrap();
        for pos in 0..20 {
            assert_eq!(x.item(pos), y.item(pos));
        }
    }

    #[test]
    fn generate_writes_instance_and_format() {
        let dir = tempfile::tempdir().unwrap();
        let args = GenerateArgs {
            seed: Some(3),
            item_number: 10,
            capacity: 50,
            min_weight: 1,
            max_weight: 10,
            class: InstanceClass::Uncorrelated,
            output: dir.path().join("gen.txt"),
        };
        args.generate().unwrap();
        let back = Instance::from_file(dir.path().join("gen.txt")).unwrap();
        assert_eq!(back.total_item_number(), 10);
        assert_eq!(back.total_capacity(), 50);
    }
}
