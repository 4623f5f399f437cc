//! Text formats for instances, optima and certificates.
//!
//! The format of an instance file is named by a `FORMAT.txt` file sitting
//! in the same directory:
//!
//! * `knapsack_standard`: `N C`, then `N` lines of `p w`.
//! * `subsetsum_standard`: `N C`, then `N` lines of `w` (profit = weight).
//! * `knapsack_pisinger`: a name line, `KEY value` header lines with keys
//!   `n`, `c` and `z`, then `N` lines of `id,p,w,x` where `x` marks the
//!   known optimum.
//!
//! A `<file>.sol` sidecar next to a standard instance holds its optimum as
//! a 0/1 vector, in the same syntax as a certificate.

use std::fs;
use std::path::Path;

use text_io::try_scan;
use tracing::debug;

use super::instance::Instance;
use super::solution::Solution;
use super::{ItemPos, KnapsackError, Profit, Weight};

impl Instance {
    /// Read an instance file, with the format taken from the `FORMAT.txt`
    /// file next to it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Instance, KnapsackError> {
        let path = path.as_ref();
        let format_path = path
            .parent()
            .map(|d| d.join("FORMAT.txt"))
            .ok_or_else(|| KnapsackError::InputMalformed("instance path has no parent".into()))?;
        let format = fs::read_to_string(&format_path).map_err(|e| {
            KnapsackError::InputMalformed(format!("{}: {}", format_path.display(), e))
        })?;
        let data = fs::read_to_string(path)?;
        let mut ins = match format.trim() {
            "knapsack_standard" => read_standard(&data, false)?,
            "subsetsum_standard" => read_standard(&data, true)?,
            "knapsack_pisinger" => read_pisinger(&data)?,
            other => {
                return Err(KnapsackError::InputMalformed(format!(
                    "unknown instance format: {}",
                    other
                )))
            }
        };
        // Standard instances may carry their optimum in a sidecar file.
        if format.trim() != "knapsack_pisinger" {
            let mut sol_path = path.as_os_str().to_owned();
            sol_path.push(".sol");
            let sol_path = Path::new(&sol_path);
            if sol_path.exists() {
                let values = read_01_vector(sol_path, ins.total_item_number())?;
                let sol = materialize(&ins, &values);
                ins.set_optimal_solution(sol);
            }
        }
        debug!(
            n = ins.total_item_number(),
            c = ins.total_capacity(),
            format = format.trim(),
            "instance read"
        );
        Ok(ins)
    }

    /// Write the instance in `knapsack_standard` format, items in their
    /// original input order.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<(), KnapsackError> {
        let mut items: Vec<_> = (0..self.total_item_number())
            .map(|pos| *self.item(pos as ItemPos))
            .collect();
        items.sort_by_key(|it| it.j);
        let mut out = String::new();
        out.push_str(&format!(
            "{} {}\n\n",
            self.total_item_number(),
            self.total_capacity()
        ));
        for it in items {
            out.push_str(&format!("{} {}\n", it.p, it.w));
        }
        fs::write(path, out)?;
        Ok(())
    }

    /// Profit of a certificate file, or -1 when the certified subset does
    /// not fit.
    pub fn check<P: AsRef<Path>>(&self, cert_path: P) -> Result<Profit, KnapsackError> {
        let values = read_01_vector(cert_path.as_ref(), self.total_item_number())?;
        let sol = materialize(self, &values);
        if sol.weight() > self.total_capacity() {
            return Ok(-1);
        }
        Ok(sol.profit())
    }
}

/// Build a solution over original indices from a 0/1 vector.
fn materialize(ins: &Instance, values: &[bool]) -> Solution {
    let mut sol = Solution::new(ins.total_item_number());
    for pos in 0..ins.total_item_number() {
        let it = ins.item(pos as ItemPos);
        if values[it.j] {
            sol.set(it, true);
        }
    }
    sol
}

/// Read `n` whitespace-separated 0/1 values.
fn read_01_vector(path: &Path, n: usize) -> Result<Vec<bool>, KnapsackError> {
    let data = fs::read_to_string(path)?;
    let mut values = Vec::with_capacity(n);
    for token in data.split_whitespace() {
        match token {
            "0" => values.push(false),
            "1" => values.push(true),
            other => {
                return Err(KnapsackError::InputMalformed(format!(
                    "certificate value {} is not 0/1",
                    other
                )))
            }
        }
    }
    if values.len() != n {
        return Err(KnapsackError::ItemCountMismatch {
            expected: n,
            found: values.len(),
        });
    }
    Ok(values)
}

fn read_standard(data: &str, subset_sum: bool) -> Result<Instance, KnapsackError> {
    let mut lines = data.lines().filter(|l| !l.trim().is_empty());
    let header = lines
        .next()
        .ok_or_else(|| KnapsackError::InputMalformed("missing instance header".into()))?;
    let n: usize;
    let c: Weight;
    try_scan!(header.bytes() => "{} {}", n, c);

    let mut ins = Instance::new(c);
    for line in lines.take(n) {
        let mut tokens = line.split_whitespace();
        if subset_sum {
            let w: Weight = parse_token(tokens.next())?;
            ins.add_item(w, w)?;
        } else {
            let p: Profit = parse_token(tokens.next())?;
            let w: Weight = parse_token(tokens.next())?;
            ins.add_item(w, p)?;
        }
    }
    if ins.total_item_number() != n {
        return Err(KnapsackError::ItemCountMismatch {
            expected: n,
            found: ins.total_item_number(),
        });
    }
    Ok(ins)
}

fn read_pisinger(data: &str) -> Result<Instance, KnapsackError> {
    let mut lines = data.lines();
    // First line is the instance name.
    lines
        .next()
        .ok_or_else(|| KnapsackError::InputMalformed("empty pisinger instance".into()))?;

    let mut n: Option<usize> = None;
    let mut c: Option<Weight> = None;
    let mut lines = lines.peekable();
    while let Some(line) = lines.peek() {
        let line = line.trim();
        if line.contains(',') {
            // Item rows start here.
            break;
        }
        let line = line.to_string();
        lines.next();
        if line.is_empty() {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let key = tokens.next().unwrap_or("");
        match key {
            "n" => n = Some(parse_token(tokens.next())?),
            "c" => c = Some(parse_token(tokens.next())?),
            // Claimed optimum; the per-item `x` column is authoritative.
            "z" => {
                let _z: i64 = parse_token(tokens.next())?;
            }
            other => {
                return Err(KnapsackError::InputMalformed(format!(
                    "unknown pisinger header key: {}",
                    other
                )))
            }
        }
    }
    let n = n.ok_or_else(|| KnapsackError::InputMalformed("missing item number".into()))?;
    let c = c.ok_or_else(|| KnapsackError::InputMalformed("missing capacity".into()))?;

    let mut ins = Instance::new(c);
    let mut taken = Vec::with_capacity(n);
    for line in lines.filter(|l| !l.trim().is_empty()).take(n) {
        let mut fields = line.trim().split(',');
        let _id: usize = parse_token(fields.next())?;
        let p: Profit = parse_token(fields.next())?;
        let w: Weight = parse_token(fields.next())?;
        let x: u8 = parse_token(fields.next())?;
        ins.add_item(w, p)?;
        taken.push(x == 1);
    }
    if ins.total_item_number() != n {
        return Err(KnapsackError::ItemCountMismatch {
            expected: n,
            found: ins.total_item_number(),
        });
    }
    let sol = materialize(&ins, &taken);
    ins.set_optimal_solution(sol);
    Ok(ins)
}

fn parse_token<T: std::str::FromStr>(token: Option<&str>) -> Result<T, KnapsackError> {
    let token = token.ok_or_else(|| KnapsackError::InputMalformed("missing field".into()))?;
    token
        .trim()
        .parse()
        .map_err(|_| KnapsackError::InputMalformed(format!("bad field: {}", token)))
}

#[cfg(test)]
mod tests {
    use super::super::testing::make_instance;
    use super::*;
    use std::fs;

    fn write_format(dir: &Path, format: &str) {
        fs::write(dir.join("FORMAT.txt"), format).unwrap();
    }

    #[test]
    fn standard_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        write_format(dir.path(), "knapsack_standard");
        let path = dir.path().join("ins.txt");

        let ins = make_instance(10, &[(2, 6), (2, 3), (6, 5), (5, 4), (4, 6)]);
        ins.write(&path).unwrap();

        let back = Instance::from_file(&path).unwrap();
        assert_eq!(back.total_item_number(), 5);
        assert_eq!(back.total_capacity(), 10);
        for pos in 0..5 {
            assert_eq!(back.item(pos), ins.item(pos));
        }
    }

    #[test]
    fn subsetsum_reads_weight_as_profit() {
        let dir = tempfile::tempdir().unwrap();
        write_format(dir.path(), "subsetsum_standard");
        let path = dir.path().join("ins.txt");
        fs::write(&path, "4 7\n3\n3\n4\n5\n").unwrap();

        let ins = Instance::from_file(&path).unwrap();
        assert_eq!(ins.total_item_number(), 4);
        assert_eq!(ins.item(2).w, 4);
        assert_eq!(ins.item(2).p, 4);
    }

    #[test]
    fn pisinger_reads_header_and_optimum() {
        let dir = tempfile::tempdir().unwrap();
        write_format(dir.path(), "knapsack_pisinger");
        let path = dir.path().join("ins.txt");
        fs::write(
            &path,
            "test_instance\nn 3\nc 10\nz 70\n\n1,10,5,0\n2,40,4,1\n3,30,6,1\n",
        )
        .unwrap();

        let ins = Instance::from_file(&path).unwrap();
        assert_eq!(ins.total_item_number(), 3);
        assert_eq!(ins.total_capacity(), 10);
        assert_eq!(ins.optimum(), Some(70));
        assert!(ins.optimal_solution().unwrap().contains(1));
        assert!(!ins.optimal_solution().unwrap().contains(0));
    }

    #[test]
    fn unknown_format_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_format(dir.path(), "knapsack_exotic");
        let path = dir.path().join("ins.txt");
        fs::write(&path, "1 1\n1 1\n").unwrap();
        assert!(matches!(
            Instance::from_file(&path),
            Err(KnapsackError::InputMalformed(_))
        ));
    }

    #[test]
    fn certificate_check_returns_profit_or_minus_one() {
        let dir = tempfile::tempdir().unwrap();
        let ins = make_instance(10, &[(5, 10), (4, 40), (6, 30)]);

        let good = dir.path().join("good.sol");
        fs::write(&good, "0 1 1\n").unwrap();
        assert_eq!(ins.check(&good).unwrap(), 70);

        let heavy = dir.path().join("heavy.sol");
        fs::write(&heavy, "1 1 1\n").unwrap();
        assert_eq!(ins.check(&heavy).unwrap(), -1);

        let short = dir.path().join("short.sol");
        fs::write(&short, "0 1\n").unwrap();
        assert!(matches!(
            ins.check(&short),
            Err(KnapsackError::ItemCountMismatch { .. })
        ));
    }

    #[test]
    fn solved_certificate_revalidates_to_the_same_profit() {
        use super::super::minknap::{minknap, MinknapParams};
        let dir = tempfile::tempdir().unwrap();
        let ins = make_instance(10, &[(2, 6), (2, 3), (6, 5), (5, 4), (4, 6)]);
        let out = minknap(&mut ins.clone(), MinknapParams::default());
        assert_eq!(out.solution.profit(), 15);

        let cert = dir.path().join("cert.txt");
        out.solution.write(&cert).unwrap();
        assert_eq!(ins.check(&cert).unwrap(), 15);
    }

    #[test]
    fn solution_sidecar_is_loaded_as_optimum() {
        let dir = tempfile::tempdir().unwrap();
        write_format(dir.path(), "knapsack_standard");
        let path = dir.path().join("ins.txt");
        fs::write(&path, "3 10\n10 5\n40 4\n30 6\n").unwrap();
        fs::write(dir.path().join("ins.txt.sol"), "0 1 1\n").unwrap();

        let ins = Instance::from_file(&path).unwrap();
        assert_eq!(ins.optimum(), Some(70));
    }
}
