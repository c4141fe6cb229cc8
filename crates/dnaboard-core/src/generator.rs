//! Question instance generation.
//!
//! Items name a generator strategy and its parameters; the registry maps
//! strategy names to [`Generator`] implementations. No author-supplied code
//! is ever executed: the most expressive strategy, `template`, evaluates
//! arithmetic expressions only.
//!
//! Every fault (unknown strategy, bad params, evaluation error, panic,
//! timeout, empty result) is contained here and turned into
//! [`Instance::placeholder`].

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, RngCore, SeedableRng};
use serde::Deserialize;
use serde_json::Value;

use crate::error::GeneratorError;
use crate::expr::{self, Vars};
use crate::model::{GeneratorRef, Instance};

/// Default hard limit for a single generation.
pub const DEFAULT_GENERATOR_TIMEOUT: Duration = Duration::from_secs(2);

/// A named strategy that produces question instances.
pub trait Generator: Send + Sync {
    /// Produce one instance from `params`, drawing randomness only from `rng`.
    fn generate(&self, params: &Value, rng: &mut dyn RngCore) -> Result<Instance, GeneratorError>;
}

/// Registry of generator strategies, keyed by name.
#[derive(Clone, Default)]
pub struct GeneratorRegistry {
    strategies: HashMap<String, Arc<dyn Generator>>,
}

impl std::fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.strategies.keys().collect();
        names.sort();
        f.debug_struct("GeneratorRegistry")
            .field("strategies", &names)
            .finish()
    }
}

impl GeneratorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in strategies: `static`, `template`,
    /// `arithmetic` and `linear_equation`.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("static", StaticGenerator);
        registry.register("template", TemplateGenerator);
        registry.register("arithmetic", ArithmeticGenerator);
        registry.register("linear_equation", LinearEquationGenerator);
        registry
    }

    /// Register (or replace) a strategy.
    pub fn register(&mut self, name: impl Into<String>, generator: impl Generator + 'static) {
        self.strategies.insert(name.into(), Arc::new(generator));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.strategies.contains_key(name)
    }

    pub fn strategy_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.strategies.keys().cloned().collect();
        names.sort();
        names
    }

    /// Run a generator, surfacing the error instead of a placeholder.
    ///
    /// Used by bank validation; board code goes through [`Self::instantiate`].
    pub fn try_instantiate(
        &self,
        reference: &GeneratorRef,
        seed: u64,
    ) -> Result<Instance, GeneratorError> {
        let generator = self
            .strategies
            .get(&reference.strategy)
            .ok_or_else(|| GeneratorError::UnknownStrategy(reference.strategy.clone()))?;

        let mut rng = StdRng::seed_from_u64(seed);
        let instance = generator.generate(&reference.params, &mut rng)?;
        if instance.question.trim().is_empty() {
            return Err(GeneratorError::EmptyQuestion);
        }
        Ok(instance)
    }

    /// Run a generator. Never fails: faults and panics become the
    /// placeholder instance.
    pub fn instantiate(&self, reference: &GeneratorRef, seed: u64) -> Instance {
        match panic::catch_unwind(AssertUnwindSafe(|| self.try_instantiate(reference, seed))) {
            Ok(Ok(instance)) => instance,
            Ok(Err(e)) => {
                tracing::warn!(strategy = %reference.strategy, "generator failed: {e}");
                Instance::placeholder()
            }
            Err(_) => {
                tracing::warn!(strategy = %reference.strategy, "generator panicked");
                Instance::placeholder()
            }
        }
    }
}

/// Run a generator on the blocking pool under a hard timeout.
///
/// A strategy that overruns is abandoned (it keeps its blocking thread until
/// it returns) and the placeholder is used instead.
pub async fn instantiate_with_timeout(
    registry: Arc<GeneratorRegistry>,
    reference: GeneratorRef,
    seed: u64,
    timeout: Duration,
) -> Instance {
    let strategy = reference.strategy.clone();
    let task = tokio::task::spawn_blocking(move || registry.instantiate(&reference, seed));

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(instance)) => instance,
        Ok(Err(e)) => {
            tracing::warn!(%strategy, "generator task failed: {e}");
            Instance::placeholder()
        }
        Err(_) => {
            tracing::warn!(%strategy, "generator timed out after {}ms", timeout.as_millis());
            Instance::placeholder()
        }
    }
}

fn parse_params<T: for<'de> Deserialize<'de>>(params: &Value) -> Result<T, GeneratorError> {
    T::deserialize(params).map_err(|e| GeneratorError::InvalidParams(e.to_string()))
}

/// Inclusive integer range parameter.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct IntRange {
    pub min: i64,
    pub max: i64,
}

impl IntRange {
    fn sample(&self, rng: &mut dyn RngCore) -> Result<i64, GeneratorError> {
        if self.min > self.max {
            return Err(GeneratorError::InvalidParams(format!(
                "range min {} exceeds max {}",
                self.min, self.max
            )));
        }
        Ok(rng.random_range(self.min..=self.max))
    }

    /// Sample, skipping zero when the range allows it.
    fn sample_nonzero(&self, rng: &mut dyn RngCore) -> Result<i64, GeneratorError> {
        if self.min == 0 && self.max == 0 {
            return Err(GeneratorError::InvalidParams(
                "range contains only zero".into(),
            ));
        }
        loop {
            let n = self.sample(rng)?;
            if n != 0 {
                return Ok(n);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// static
// ---------------------------------------------------------------------------

/// Fixed question and answer.
pub struct StaticGenerator;

#[derive(Deserialize)]
struct StaticParams {
    question: String,
    answer: String,
    #[serde(default)]
    image: Option<String>,
}

impl Generator for StaticGenerator {
    fn generate(&self, params: &Value, _rng: &mut dyn RngCore) -> Result<Instance, GeneratorError> {
        let p: StaticParams = parse_params(params)?;
        Ok(Instance {
            question: p.question,
            answer: p.answer,
            image: p.image,
        })
    }
}

// ---------------------------------------------------------------------------
// template
// ---------------------------------------------------------------------------

/// Parameterized text with `{expr}` placeholders over random variables.
pub struct TemplateGenerator;

#[derive(Deserialize)]
struct TemplateParams {
    question: String,
    answer: String,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    vars: Vec<TemplateVar>,
}

#[derive(Deserialize)]
struct TemplateVar {
    name: String,
    #[serde(flatten)]
    source: VarSource,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum VarSource {
    Range {
        min: i64,
        max: i64,
        #[serde(default)]
        nonzero: bool,
    },
    Choices {
        choices: Vec<f64>,
    },
    Derived {
        expr: String,
    },
}

impl Generator for TemplateGenerator {
    fn generate(&self, params: &Value, rng: &mut dyn RngCore) -> Result<Instance, GeneratorError> {
        let p: TemplateParams = parse_params(params)?;
        let mut vars = Vars::new();

        // Later variables may refer to earlier ones.
        for var in &p.vars {
            let value = match &var.source {
                VarSource::Range { min, max, nonzero } => {
                    let range = IntRange {
                        min: *min,
                        max: *max,
                    };
                    let n = if *nonzero {
                        range.sample_nonzero(rng)?
                    } else {
                        range.sample(rng)?
                    };
                    n as f64
                }
                VarSource::Choices { choices } => *choices.choose(&mut *rng).ok_or_else(|| {
                    GeneratorError::InvalidParams(format!("variable '{}' has no choices", var.name))
                })?,
                VarSource::Derived { expr } => expr::eval_str(expr, &vars)?,
            };
            vars.insert(var.name.clone(), value);
        }

        let image = p
            .image
            .as_deref()
            .map(|img| expr::render(img, &vars))
            .transpose()?;

        Ok(Instance {
            question: expr::render(&p.question, &vars)?,
            answer: expr::render(&p.answer, &vars)?,
            image,
        })
    }
}

// ---------------------------------------------------------------------------
// arithmetic
// ---------------------------------------------------------------------------

/// Two-operand arithmetic drill.
pub struct ArithmeticGenerator;

#[derive(Deserialize)]
struct ArithmeticParams {
    op: String,
    a: IntRange,
    b: IntRange,
}

impl Generator for ArithmeticGenerator {
    fn generate(&self, params: &Value, rng: &mut dyn RngCore) -> Result<Instance, GeneratorError> {
        let p: ArithmeticParams = parse_params(params)?;

        let (a, b, symbol, result) = match p.op.as_str() {
            "+" => {
                let (a, b) = (p.a.sample(rng)?, p.b.sample(rng)?);
                (a, b, "+", checked(a.checked_add(b))?)
            }
            "-" => {
                let (a, b) = (p.a.sample(rng)?, p.b.sample(rng)?);
                (a, b, "-", checked(a.checked_sub(b))?)
            }
            "*" | "×" => {
                let (a, b) = (p.a.sample(rng)?, p.b.sample(rng)?);
                (a, b, "×", checked(a.checked_mul(b))?)
            }
            // `a` is the quotient range so the answer is always whole.
            "/" | "÷" => {
                let quotient = p.a.sample(rng)?;
                let divisor = p.b.sample_nonzero(rng)?;
                let dividend = checked(quotient.checked_mul(divisor))?;
                (dividend, divisor, "÷", quotient)
            }
            other => {
                return Err(GeneratorError::InvalidParams(format!(
                    "unsupported operator '{other}'"
                )))
            }
        };

        let b_text = if b < 0 {
            format!("({b})")
        } else {
            b.to_string()
        };

        Ok(Instance::new(
            format!("${a} {symbol} {b_text}$"),
            format!("${result}$"),
        ))
    }
}

fn checked(value: Option<i64>) -> Result<i64, GeneratorError> {
    value.ok_or_else(|| GeneratorError::InvalidParams("integer overflow".to_string()))
}

// ---------------------------------------------------------------------------
// linear_equation
// ---------------------------------------------------------------------------

/// Linear equation `ax + b = c` with an integer solution.
pub struct LinearEquationGenerator;

#[derive(Deserialize)]
struct LinearParams {
    #[serde(default = "default_coefficient")]
    a: IntRange,
    #[serde(default = "default_constant")]
    b: IntRange,
    #[serde(default = "default_solution")]
    x: IntRange,
}

fn default_coefficient() -> IntRange {
    IntRange { min: 2, max: 9 }
}

fn default_constant() -> IntRange {
    IntRange { min: -10, max: 10 }
}

fn default_solution() -> IntRange {
    IntRange { min: -10, max: 10 }
}

impl Generator for LinearEquationGenerator {
    fn generate(&self, params: &Value, rng: &mut dyn RngCore) -> Result<Instance, GeneratorError> {
        let p: LinearParams = parse_params(params)?;
        let a = p.a.sample_nonzero(rng)?;
        let b = p.b.sample(rng)?;
        let x = p.x.sample(rng)?;
        let c = checked(a.checked_mul(x).and_then(|ax| ax.checked_add(b)))?;

        let lhs = match a {
            1 => "x".to_string(),
            -1 => "-x".to_string(),
            a => format!("{a}x"),
        };
        let lhs = match b {
            0 => lhs,
            b if b > 0 => format!("{lhs} + {b}"),
            b => format!("{lhs} - {}", b.abs()),
        };

        Ok(Instance::new(
            format!("Solve ${lhs} = {c}$"),
            format!("$x = {x}$"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExprError;
    use serde_json::json;

    struct PanickingGenerator;

    impl Generator for PanickingGenerator {
        fn generate(&self, _: &Value, _: &mut dyn RngCore) -> Result<Instance, GeneratorError> {
            panic!("boom")
        }
    }

    struct BlankGenerator;

    impl Generator for BlankGenerator {
        fn generate(&self, _: &Value, _: &mut dyn RngCore) -> Result<Instance, GeneratorError> {
            Ok(Instance::new("   ", "x"))
        }
    }

    struct SlowGenerator;

    impl Generator for SlowGenerator {
        fn generate(&self, _: &Value, _: &mut dyn RngCore) -> Result<Instance, GeneratorError> {
            std::thread::sleep(Duration::from_millis(500));
            Ok(Instance::new("late", "late"))
        }
    }

    fn registry() -> GeneratorRegistry {
        let mut r = GeneratorRegistry::builtin();
        r.register("panics", PanickingGenerator);
        r.register("blank", BlankGenerator);
        r.register("slow", SlowGenerator);
        r
    }

    #[test]
    fn static_strategy() {
        let reference = GeneratorRef::new(
            "static",
            json!({"question": "Name the shape", "answer": "Square", "image": "<svg/>"}),
        );
        let inst = registry().instantiate(&reference, 1);
        assert_eq!(inst.question, "Name the shape");
        assert_eq!(inst.answer, "Square");
        assert_eq!(inst.image.as_deref(), Some("<svg/>"));
    }

    #[test]
    fn template_answer_matches_question() {
        let reference = GeneratorRef::new(
            "template",
            json!({
                "question": "What is {a} + {b}?",
                "answer": "{sum}",
                "vars": [
                    {"name": "a", "min": 1, "max": 10},
                    {"name": "b", "min": 1, "max": 10},
                    {"name": "sum", "expr": "a + b"}
                ]
            }),
        );
        let r = registry();
        for seed in 0..20 {
            let inst = r.instantiate(&reference, seed);
            assert!(!inst.is_placeholder());
            let nums: Vec<i64> = inst
                .question
                .trim_start_matches("What is ")
                .trim_end_matches('?')
                .split(" + ")
                .map(|n| n.parse().unwrap())
                .collect();
            assert_eq!(inst.answer, (nums[0] + nums[1]).to_string());
        }
    }

    #[test]
    fn template_choices() {
        let reference = GeneratorRef::new(
            "template",
            json!({
                "question": "{n}",
                "answer": "{n * 2}",
                "vars": [{"name": "n", "choices": [5, 7]}]
            }),
        );
        let inst = registry().instantiate(&reference, 3);
        assert!(inst.question == "5" || inst.question == "7");
    }

    #[test]
    fn same_seed_same_instance() {
        let reference = GeneratorRef::new(
            "arithmetic",
            json!({"op": "*", "a": {"min": 2, "max": 12}, "b": {"min": 2, "max": 12}}),
        );
        let r = registry();
        assert_eq!(r.instantiate(&reference, 42), r.instantiate(&reference, 42));
    }

    #[test]
    fn division_is_always_whole() {
        let reference = GeneratorRef::new(
            "arithmetic",
            json!({"op": "/", "a": {"min": 1, "max": 12}, "b": {"min": 0, "max": 12}}),
        );
        let r = registry();
        for seed in 0..50 {
            let inst = r.instantiate(&reference, seed);
            let body = inst.question.trim_matches('$');
            let parts: Vec<i64> = body.split(" ÷ ").map(|n| n.parse().unwrap()).collect();
            let answer: i64 = inst.answer.trim_matches('$').parse().unwrap();
            assert_ne!(parts[1], 0);
            assert_eq!(parts[0], parts[1] * answer);
        }
    }

    #[test]
    fn linear_equation_solution_checks_out() {
        let reference = GeneratorRef::new("linear_equation", json!({}));
        let inst = registry().instantiate(&reference, 9);
        assert!(inst.question.starts_with("Solve $"));
        assert!(inst.answer.starts_with("$x = "));
    }

    #[test]
    fn faults_become_placeholders() {
        let r = registry();
        let cases = [
            GeneratorRef::new("does_not_exist", json!({})),
            GeneratorRef::new("static", json!({"question": 5})),
            GeneratorRef::new(
                "template",
                json!({"question": "{a / 0}", "answer": "x", "vars": [{"name": "a", "min": 1, "max": 1}]}),
            ),
            GeneratorRef::new("arithmetic", json!({"op": "sqrt", "a": {"min": 1, "max": 2}, "b": {"min": 1, "max": 2}})),
            GeneratorRef::new("panics", json!({})),
            GeneratorRef::new("blank", json!({})),
        ];
        for reference in &cases {
            let inst = r.instantiate(reference, 0);
            assert!(inst.is_placeholder(), "{} should fail", reference.strategy);
        }
    }

    #[test]
    fn deeply_nested_template_becomes_placeholder() {
        let depth = 600;
        let question = format!("{{{}1{}}}", "(".repeat(depth), ")".repeat(depth));
        let reference = GeneratorRef::new("template", json!({"question": question, "answer": "1"}));

        // Same stack size as tokio's blocking pool.
        let inst = std::thread::Builder::new()
            .stack_size(2 * 1024 * 1024)
            .spawn(move || registry().instantiate(&reference, 0))
            .unwrap()
            .join()
            .unwrap();
        assert!(inst.is_placeholder());

        let depth = expr::MAX_DEPTH + 1;
        let question = format!("{{{}1{}}}", "(".repeat(depth), ")".repeat(depth));
        let err = registry()
            .try_instantiate(
                &GeneratorRef::new("template", json!({"question": question, "answer": "1"})),
                0,
            )
            .unwrap_err();
        assert!(matches!(err, GeneratorError::Eval(ExprError::TooDeep(_))));
    }

    #[test]
    fn integer_overflow_becomes_placeholder() {
        let r = registry();
        let big = i64::MAX / 2 + 1;
        let cases = [
            GeneratorRef::new("arithmetic", json!({"op": "+", "a": {"min": big, "max": big}, "b": {"min": big, "max": big}})),
            GeneratorRef::new("arithmetic", json!({"op": "*", "a": {"min": big, "max": big}, "b": {"min": 3, "max": 3}})),
            GeneratorRef::new("arithmetic", json!({"op": "/", "a": {"min": big, "max": big}, "b": {"min": 4, "max": 4}})),
            GeneratorRef::new("linear_equation", json!({"a": {"min": big, "max": big}, "x": {"min": 5, "max": 5}})),
        ];
        for reference in &cases {
            let err = r.try_instantiate(reference, 0).unwrap_err();
            assert!(matches!(err, GeneratorError::InvalidParams(_)), "{err}");
            assert!(r.instantiate(reference, 0).is_placeholder());
        }
    }

    #[test]
    fn try_instantiate_surfaces_errors() {
        let r = registry();
        let err = r
            .try_instantiate(&GeneratorRef::new("nope", json!({})), 0)
            .unwrap_err();
        assert!(matches!(err, GeneratorError::UnknownStrategy(_)));
        let err = r
            .try_instantiate(&GeneratorRef::new("blank", json!({})), 0)
            .unwrap_err();
        assert!(matches!(err, GeneratorError::EmptyQuestion));
    }

    #[tokio::test]
    async fn timeout_yields_placeholder() {
        let r = Arc::new(registry());
        let inst = instantiate_with_timeout(
            r,
            GeneratorRef::new("slow", json!({})),
            0,
            Duration::from_millis(20),
        )
        .await;
        assert!(inst.is_placeholder());
    }

    #[tokio::test]
    async fn fast_generator_within_timeout() {
        let r = Arc::new(registry());
        let inst = instantiate_with_timeout(
            r,
            GeneratorRef::new("static", json!({"question": "q", "answer": "a"})),
            0,
            DEFAULT_GENERATOR_TIMEOUT,
        )
        .await;
        assert_eq!(inst, Instance::new("q", "a"));
    }

    #[test]
    fn builtin_strategy_names() {
        assert_eq!(
            GeneratorRegistry::builtin().strategy_names(),
            vec!["arithmetic", "linear_equation", "static", "template"]
        );
    }
}
