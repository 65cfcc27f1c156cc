pub mod corpus;
pub mod hashing;
pub mod lsh;
pub mod minhash;
pub mod primes;
pub mod similarity;
pub mod tokenizer;
