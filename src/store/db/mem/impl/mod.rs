mod action;
mod metrics;
mod run;
