#![cfg(test)]

mod discovery;
mod identify;
mod support;
