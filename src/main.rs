//! Hive 命令行入口
//!
//! 初始化日志、加载配置、装配记忆/模型/工具后执行一次运行；
//! 配置了 [[pipeline]] 时按流水线执行，否则按 [agent] 执行。
//! 模型挂起询问用户时从 stdin 读取回答并继续；流水线从挂起的阶段接着执行。

use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::Context;
use hive::agent::AgentDeps;
use hive::config::{load_config, AppConfig};
use hive::core::{FlowResult, Orchestrator, RunOptions, SUSPENDED_STAGE_KEY};
use hive::llm::create_llm_client;
use hive::memory::{BudgetedMemory, ConversationPersistence, MemoryTracker};
use hive::tools::{EchoTool, ToolExecutor, ToolRegistry, UpdateTasksTool};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    hive::observability::init();

    let config = load_config(None).context("Failed to load config")?;
    let input = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    let input = if input.trim().is_empty() {
        read_line("> ")?
    } else {
        input
    };

    let persistence = config
        .memory
        .persist_path
        .as_ref()
        .map(ConversationPersistence::new);
    let memory = Arc::new(build_memory(&config, persistence.as_ref()));

    let orchestrator = build_orchestrator(&config, memory.clone())?;

    let mut result = if orchestrator.agents().is_empty() {
        orchestrator.run_flow(&input, RunOptions::default()).await?
    } else {
        orchestrator.execute_agents(&input).await?
    };

    while let Some(pending) = result.pending_ask_user.take() {
        println!("{}", pending.question);
        if let Some(details) = pending.details.as_deref() {
            println!("{details}");
        }
        let answer = read_line("> ")?;
        if answer.trim().is_empty() {
            break;
        }
        // 流水线挂起时从挂起的阶段继续，后续阶段照常执行
        let suspended_stage = result
            .state
            .data
            .get(SUSPENDED_STAGE_KEY)
            .and_then(|v| v.as_u64());
        result = match suspended_stage {
            Some(stage) => orchestrator.resume_agents(stage as usize, &answer).await?,
            None => orchestrator.run_flow(&answer, RunOptions::default()).await?,
        };
    }

    print_result(&result);

    if let Some(persistence) = persistence {
        persistence
            .save(&memory.snapshot().await)
            .context("Failed to save conversation")?;
    }
    Ok(())
}

fn build_memory(config: &AppConfig, persistence: Option<&ConversationPersistence>) -> BudgetedMemory {
    let memory = BudgetedMemory::new(config.memory.context_window, config.memory.total_budget);
    let Some(persistence) = persistence else {
        return memory;
    };
    match persistence.load() {
        Ok(messages) => memory.with_messages(messages),
        Err(e) => {
            tracing::warn!(path = %persistence.path().display(), error = %e, "conversation restore failed");
            memory
        }
    }
}

fn build_orchestrator(config: &AppConfig, memory: Arc<BudgetedMemory>) -> anyhow::Result<Orchestrator> {
    let llm = create_llm_client(&config.llm).context("Failed to create LLM client")?;
    let registry = ToolRegistry::new()
        .with_tool(EchoTool)
        .with_tool(UpdateTasksTool);
    let tools = ToolExecutor::new(registry, config.tools.tool_timeout_secs);
    let deps = AgentDeps::new(memory, llm).with_tools(tools);

    let mut orchestrator = Orchestrator::new(deps, config.agent.to_agent_config());
    for stage in &config.pipeline {
        orchestrator = orchestrator.add_agent(stage.to_agent_config());
    }
    Ok(orchestrator)
}

fn print_result(result: &FlowResult) {
    match result.final_output.as_deref() {
        Some(text) => println!("{text}"),
        None => println!("(no final answer)"),
    }
}

fn read_line(prompt: &str) -> anyhow::Result<String> {
    print!("{prompt}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end().to_string())
}
