// 该文件是 Kanjian （看见） 项目的一部分。
// src/bin/simple_oneshot.rs - 只处理第一帧的简单程序
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Kanjian contributors

use anyhow::Result;
use clap::Parser;

use kanjian::{
  FromUrl,
  args::Args,
  frame::TensorFrame,
  input::InputWrapper,
  output::OutputWrapper,
  task::{OneShotTask, Task},
};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();
  args.log_args();

  let input = InputWrapper::from_url(&args.input)?;
  let model = args.detector_builder()?.build::<TensorFrame>()?;
  let output = OutputWrapper::from_url(&args.output)?;

  OneShotTask.run_task(input, model, output)?;

  Ok(())
}
