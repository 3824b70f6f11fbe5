//! Pipeline benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use scrunch::{minify, parse, Lexer, MinifyOptions, TokenKind};

const SAMPLE_SOURCE: &str = r#"
// Sample ES3 code for benchmarking
function fibonacci(n) {
    if (n <= 1) return n;
    return fibonacci(n - 1) + fibonacci(n - 2);
}

function Calculator() {
    this.result = 0;
}

Calculator.prototype.add = function (x, y) {
    var total = x + y;
    this.result = total;
    return total;
};

Calculator.prototype.multiply = function (x, y) {
    var product = x * y;
    this.result = product;
    return product;
};

function sumTable(table) {
    var total = 0;
    for (var key in table) {
        if (table.hasOwnProperty(key)) {
            total += table[key];
        }
    }
    return total;
}

var calc = new Calculator();
var numbers = [1, 2, 3, 4, 5];
var settings = { "retries": 3, "timeout": 1000, "strict mode": false };

outer: for (var i = 0; i < numbers.length; i++) {
    for (var j = i + 1; j < numbers.length; j++) {
        if (numbers[i] + numbers[j] === 7) {
            break outer;
        }
    }
}

try {
    calc.add(fibonacci(10), sumTable(settings));
} catch (err) {
    reportError(err);
}
"#;

fn bench_lexer(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer");
    group.throughput(Throughput::Bytes(SAMPLE_SOURCE.len() as u64));

    group.bench_function("sample", |b| {
        b.iter(|| {
            let mut lexer = Lexer::new(black_box(SAMPLE_SOURCE));
            loop {
                let token = lexer.next_token();
                if matches!(token.kind, TokenKind::Eof) {
                    break;
                }
            }
        });
    });

    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    group.throughput(Throughput::Bytes(SAMPLE_SOURCE.len() as u64));

    group.bench_function("sample", |b| {
        b.iter(|| parse(black_box(SAMPLE_SOURCE)).unwrap());
    });

    group.finish();
}

fn bench_minify(c: &mut Criterion) {
    let mut group = c.benchmark_group("minify");
    group.throughput(Throughput::Bytes(SAMPLE_SOURCE.len() as u64));

    let options = MinifyOptions::default();
    group.bench_function("sample", |b| {
        b.iter(|| minify(black_box(SAMPLE_SOURCE), &options).unwrap());
    });

    group.finish();
}

criterion_group!(benches, bench_lexer, bench_parse, bench_minify);
criterion_main!(benches);
