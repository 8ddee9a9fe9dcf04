use clap::{Parser as ClapParser, Subcommand, ValueEnum};
use std::process;

use fastpath::sandbox::{Sandbox, SandboxCreateInfo};
use fastpath::{
    Coercion, ObjectModel, Operator, RuntimeError, SendCache, Value, ValueKind, container, masgn,
    native, numeric,
};

#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Operators to treat as redefined on the builtin classes
    #[arg(long, value_name = "OP", help = "Force generic dispatch for an operator")]
    redefine: Vec<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply a binary operator to two literals, e.g. `eval 3 + 4`
    Eval {
        left: String,
        op: String,
        right: String,
    },
    /// Marshal a literal to a native type, e.g. `narrow u8 300`
    Narrow {
        #[arg(value_enum)]
        ty: NativeType,
        value: String,
    },
    /// Destructure a list of literals around a splat
    Masgn {
        #[arg(long, default_value_t = 0)]
        before: usize,
        #[arg(long, default_value_t = 0)]
        after: usize,
        items: Vec<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum NativeType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    Bool,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let mut redefinitions = Vec::new();
    for name in &cli.redefine {
        match Operator::from_name(name) {
            Some(op) => redefinitions.push(op),
            None => {
                eprintln!("Unknown operator '{}'", name);
                process::exit(1);
            }
        }
    }
    let mut sb = Sandbox::new(SandboxCreateInfo {
        redefinitions,
        ..Default::default()
    });

    let result = match cli.command {
        Command::Eval { left, op, right } => eval(&mut sb, &left, &op, &right),
        Command::Narrow { ty, value } => narrow(&mut sb, ty, &value),
        Command::Masgn {
            before,
            after,
            items,
        } => destructure(&mut sb, before, after, &items),
    };

    match result {
        Ok(output) => println!("{}", output),
        Err(err) => {
            eprintln!("Error: {}", err);
            process::exit(1);
        }
    }
    let stats = sb.stats();
    eprintln!(
        "dispatches: {}, constant lookups: {}, slot resolutions: {}",
        stats.dispatches, stats.constant_lookups, stats.slot_resolutions
    );
}

fn eval(sb: &mut Sandbox, left: &str, op: &str, right: &str) -> Result<String, RuntimeError> {
    let op = Operator::from_name(op).ok_or_else(|| RuntimeError::ArgumentError {
        message: format!("unknown operator '{op}'"),
    })?;
    let left = parse_literal(sb, left);
    let right = parse_literal(sb, right);
    let overridden = sb.overridden(op);
    let mut cache = SendCache::new();
    let cache = &mut cache;

    let value = match op {
        Operator::Plus => numeric::fast_plus(sb, cache, left, right, overridden),
        Operator::Minus => numeric::fast_minus(sb, cache, left, right, overridden),
        Operator::Mult => numeric::fast_mult(sb, cache, left, right, overridden),
        Operator::Div => numeric::fast_div(sb, cache, left, right, overridden),
        Operator::Lt => numeric::fast_lt(sb, cache, left, right, overridden),
        Operator::Le => numeric::fast_le(sb, cache, left, right, overridden),
        Operator::Gt => numeric::fast_gt(sb, cache, left, right, overridden),
        Operator::Ge => numeric::fast_ge(sb, cache, left, right, overridden),
        Operator::Eq => numeric::fast_eq(sb, cache, left, right, overridden),
        Operator::Eqq => numeric::fast_eqq(sb, cache, left, right, overridden),
        Operator::Neq => numeric::fast_neq(sb, cache, left, right, overridden),
        // SAFETY: both literals were parsed into `sb`
        Operator::Aref => unsafe { container::fast_aref(sb, cache, left, right, overridden) },
        Operator::LtLt => unsafe { container::fast_shift(sb, cache, left, right, overridden) },
        Operator::Aset => {
            return Err(RuntimeError::ArgumentError {
                message: "`[]=` takes two arguments".into(),
            });
        }
    }?;
    Ok(describe(sb, value))
}

fn narrow(sb: &mut Sandbox, ty: NativeType, text: &str) -> Result<String, RuntimeError> {
    let value = parse_literal(sb, text);
    Ok(match ty {
        NativeType::I8 => native::value_to_i8(sb, value)?.to_string(),
        NativeType::U8 => native::value_to_u8(sb, value)?.to_string(),
        NativeType::I16 => native::value_to_i16(sb, value)?.to_string(),
        NativeType::U16 => native::value_to_u16(sb, value)?.to_string(),
        NativeType::I32 => native::value_to_i32(sb, value)?.to_string(),
        NativeType::U32 => native::value_to_u32(sb, value)?.to_string(),
        NativeType::I64 => native::value_to_i64(sb, value)?.to_string(),
        NativeType::U64 => native::value_to_u64(sb, value)?.to_string(),
        NativeType::F32 => native::value_to_f32(sb, value)?.to_string(),
        NativeType::F64 => native::value_to_f64(sb, value)?.to_string(),
        NativeType::Bool => (native::value_to_bool(value) as u8).to_string(),
    })
}

fn destructure(sb: &mut Sandbox, before: usize, after: usize, items: &[String]) -> Result<String, RuntimeError> {
    let values: Vec<Value> = items.iter().map(|item| parse_literal(sb, item)).collect();
    let literal = sb.new_array(&values);
    let ary = masgn::to_ary(sb, literal)?;

    let mut lines = Vec::new();
    for i in 0..before {
        let value = masgn::before_splat(sb, ary, i);
        lines.push(format!("before[{i}] = {}", describe(sb, value)));
    }
    let rest = masgn::splat(sb, ary, before, after);
    lines.push(format!("*rest = {}", describe(sb, rest)));
    for i in 0..after {
        let value = masgn::after_splat(sb, ary, before, after, i);
        lines.push(format!("after[{i}] = {}", describe(sb, value)));
    }
    Ok(lines.join("\n"))
}

/// `nil`, `true`, `false`, integers, floats, `:symbols`, anything else is a
/// string.
fn parse_literal(sb: &mut Sandbox, text: &str) -> Value {
    match text {
        "nil" => return Value::NIL,
        "true" => return Value::TRUE,
        "false" => return Value::FALSE,
        _ => {}
    }
    if let Ok(n) = text.parse::<i128>() {
        return match i64::try_from(n).ok().and_then(Value::try_from_i64) {
            Some(value) => value,
            None => sb.bignum_from_i128(n),
        };
    }
    if let Ok(f) = text.parse::<f64>() {
        return Value::from_f64(f);
    }
    if let Some(name) = text.strip_prefix(':') {
        return sb.symbol(name);
    }
    let unquoted = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text);
    sb.new_string(unquoted)
}

fn describe(sb: &Sandbox, value: Value) -> String {
    match value.kind() {
        ValueKind::Fixnum(n) => return n.to_string(),
        ValueKind::Float(f) => return format!("{f:?}"),
        ValueKind::True => return "true".into(),
        ValueKind::False => return "false".into(),
        ValueKind::Nil | ValueKind::Undef => return "nil".into(),
        ValueKind::Reference => {}
    }
    if let Some(n) = sb.integer_value(value) {
        return n.to_string();
    }
    if let Some(text) = sb.string_text(value) {
        return format!("{text:?}");
    }
    if let Some(name) = sb.symbol_id(value).and_then(|id| sb.interner().name(id)) {
        return format!(":{name}");
    }
    if sb.builtin_type(value) == fastpath::BuiltinType::Array {
        let items: Vec<String> = sb
            .array_items(value)
            .into_iter()
            .map(|item| describe(sb, item))
            .collect();
        return format!("[{}]", items.join(", "));
    }
    format!("{value:?}")
}
