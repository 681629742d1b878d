use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter},
};
use std::sync::LazyLock;

pub static METER: LazyLock<Meter> = LazyLock::new(|| global::meter("clue-discovery"));

// --- LLM upstream (completion proxy) ---

pub static GEN_AI_TOKEN_USAGE: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("gen_ai.client.token.usage")
        .with_description("Number of tokens used per LLM call")
        .with_unit("{token}")
        .build()
});

pub static GEN_AI_OPERATION_DURATION: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("gen_ai.client.operation.duration")
        .with_description("Duration of LLM operations in seconds")
        .with_unit("s")
        .build()
});

pub static GEN_AI_ERROR_COUNT: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("gen_ai.client.error.count")
        .with_description("Number of LLM call errors")
        .with_unit("{error}")
        .build()
});

// --- Report generation ---

pub static REPORT_GENERATION_DURATION: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("report.generation.duration")
        .with_description("Prompt fetch plus completion duration in seconds")
        .with_unit("s")
        .build()
});

pub static REPORT_GENERATION_OUTCOMES: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("report.generation.outcome")
        .with_description("Report generation attempts by outcome")
        .with_unit("{attempt}")
        .build()
});

pub static REPORT_LENGTH: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("report.length")
        .with_description("Length of generated reports in bytes")
        .with_unit("By")
        .build()
});

pub static PROMPT_FETCH_DURATION: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("prompt.fetch.duration")
        .with_description("Duration of prompt template fetches in seconds")
        .with_unit("s")
        .build()
});

// --- Questionnaire ---

pub static ANSWERS_RECORDED: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("questionnaire.answers.recorded")
        .with_description("Number of answers written to the session")
        .with_unit("{answer}")
        .build()
});

// --- HTTP Metrics ---

pub static HTTP_REQUESTS_TOTAL: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("http.requests.total")
        .with_description("Total number of HTTP requests")
        .with_unit("{request}")
        .build()
});

pub static HTTP_REQUEST_DURATION: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("http.request.duration")
        .with_description("HTTP request duration in milliseconds")
        .with_unit("ms")
        .with_boundaries(vec![
            1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 5000.0, 10000.0, 30000.0,
        ])
        .build()
});
