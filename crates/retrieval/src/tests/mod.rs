
mod agentic_flow;
