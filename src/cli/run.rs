use colored::Colorize;
use futures::StreamExt;
use log::debug;
use std::io::{self, Write};

use super::args::{Args, Command, ImageCommand};
use crate::{
    codec::EmbeddingInput,
    core::{AzureError, Config},
    providers::{
        azure::types::{
            ChatCompletionRequest, ChunkAccumulator, EmbeddingsRequest, EncodingFormat, FileUpload,
            ImageEditRequest, ImageGenerationRequest, ImageVariationRequest, ImagesResponse,
            Message, TranscriptionRequest, TranslationRequest,
        },
        AzureOpenAIClient,
    },
};

const API_KEY_ENV: &str = "AZURE_OPENAI_API_KEY";

fn create_client(config: Config) -> Result<AzureOpenAIClient, AzureError> {
    let api_key = dotenv::var(API_KEY_ENV)
        .or_else(|_| std::env::var(API_KEY_ENV))
        .map_err(|_| AzureError::ConfigError(format!("{API_KEY_ENV} not set in .env or environment")))?;
    AzureOpenAIClient::new(api_key, config)
}

pub async fn run(args: Args) -> Result<(), AzureError> {
    let _ = dotenv::dotenv();

    let config = Config::load()?;
    debug!(
        "[SETTINGS] endpoint: {}, api_version: {}",
        config.endpoint, config.api_version
    );

    let client = create_client(config)?;
    let result = dispatch(&client, args.command).await;
    client.shutdown();
    result
}

async fn dispatch(client: &AzureOpenAIClient, command: Command) -> Result<(), AzureError> {
    let mut stdout = io::stdout();
    match command {
        Command::Chat {
            prompt,
            system,
            no_stream,
        } => chat(client, prompt, system, no_stream, &mut stdout).await,
        Command::Embed { texts, base64 } => embed(client, texts, base64, &mut stdout).await,
        Command::Transcribe { file, language } => {
            let request = TranscriptionRequest {
                language,
                ..TranscriptionRequest::new(FileUpload::read(&file).await?)
            };
            let result = client.transcribe(&request).await?;
            writeln!(stdout, "{}", result.text)?;
            Ok(())
        }
        Command::Translate { file } => {
            let request = TranslationRequest::new(FileUpload::read(&file).await?);
            let result = client.translate(&request).await?;
            writeln!(stdout, "{}", result.text)?;
            Ok(())
        }
        Command::Image(command) => {
            let response = image(client, command).await?;
            print_images(&response, &mut stdout)
        }
    }
}

async fn chat(
    client: &AzureOpenAIClient,
    prompt: String,
    system: Option<String>,
    no_stream: bool,
    out: &mut impl Write,
) -> Result<(), AzureError> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = system {
        messages.push(Message::system(system));
    }
    messages.push(Message::user(prompt));
    let request = ChatCompletionRequest::new(messages);

    if no_stream {
        let completion = client.chat_completion(&request).await?;
        for choice in completion.choices {
            writeln!(out, "{}", choice.message.content())?;
        }
        debug!("usage: {:?}", completion.usage);
        return Ok(());
    }

    let mut stream = client.chat_completion_stream(&request).await?;
    let mut accumulator = ChunkAccumulator::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        for choice in chunk.choices.iter().filter(|choice| choice.index == 0) {
            if let Some(content) = &choice.delta.content {
                write!(out, "{content}")?;
                out.flush()?;
            }
        }
        accumulator.push(&chunk);
    }
    writeln!(out)?;

    if let Some(reason) = accumulator.finish_reason(0) {
        debug!("finish reason: {reason:?}");
    }
    if let Some(usage) = accumulator.usage() {
        debug!("usage: {usage:?}");
    }
    Ok(())
}

async fn embed(
    client: &AzureOpenAIClient,
    texts: Vec<String>,
    base64: bool,
    out: &mut impl Write,
) -> Result<(), AzureError> {
    let input = match <[String; 1]>::try_from(texts) {
        Ok([text]) => EmbeddingInput::Text(text),
        Err(texts) => EmbeddingInput::TextArray(texts),
    };
    let request = EmbeddingsRequest {
        encoding_format: base64.then_some(EncodingFormat::Base64),
        ..EmbeddingsRequest::new(input)
    };
    let response = client.embeddings(&request).await?;
    for embedding in &response.data {
        let values = embedding.embedding.to_f32_vec().ok_or_else(|| {
            AzureError::InvalidResponse(format!("embedding {} is not a float vector", embedding.index))
        })?;
        let preview: Vec<String> = values.iter().take(4).map(|v| format!("{v:.4}")).collect();
        let label = format!("#{}", embedding.index);
        writeln!(
            out,
            "{} dims={} [{}, ...]",
            label.as_str().bold(),
            values.len(),
            preview.join(", ")
        )?;
    }
    debug!("usage: {:?}", response.usage);
    Ok(())
}

async fn image(
    client: &AzureOpenAIClient,
    command: ImageCommand,
) -> Result<ImagesResponse, AzureError> {
    match command {
        ImageCommand::Generate { prompt, n, size } => {
            let request = ImageGenerationRequest {
                n,
                size,
                ..ImageGenerationRequest::new(prompt)
            };
            client.generate_images(&request).await
        }
        ImageCommand::Edit {
            image,
            prompt,
            mask,
        } => {
            let mask = match mask {
                Some(path) => Some(FileUpload::read(path).await?),
                None => None,
            };
            let request = ImageEditRequest {
                mask,
                ..ImageEditRequest::new(FileUpload::read(image).await?, prompt)
            };
            client.edit_image(&request).await
        }
        ImageCommand::Variation { image } => {
            let request = ImageVariationRequest::new(FileUpload::read(image).await?);
            client.image_variation(&request).await
        }
    }
}

fn print_images(response: &ImagesResponse, out: &mut impl Write) -> Result<(), AzureError> {
    for (i, data) in response.data.iter().enumerate() {
        let label = format!("[{i}]");
        let label = label.as_str().bold();
        match (&data.url, &data.b64_json) {
            (Some(url), _) => writeln!(out, "{label} {}", url.cyan())?,
            (None, Some(b64)) => writeln!(out, "{label} <{} base64 bytes>", b64.len())?,
            (None, None) => writeln!(out, "{label} {}", "(no image data)".dimmed())?,
        }
        if let Some(revised) = &data.revised_prompt {
            writeln!(out, "    {}", revised.italic())?;
        }
    }
    Ok(())
}
