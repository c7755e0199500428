// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus TCP server over the device datastore
//!
//! For avoiding confusion with the Modbus master/slave terminology, this module uses
//! the terms "server" and "client" instead. The simulated device is the server (slave),
//! the PLC or SCADA polling it is the client (master).
//!
//! Every accepted connection gets its own [`DeviceModbusServer`] instance; all of them
//! share the same [`DeviceDatastore`], so a value written by one client is visible to
//! every other client and to the control surface.

use std::{
    future::{self, Future},
    io,
    net::SocketAddr,
    pin::Pin,
    task::{Context as TaskContext, Poll},
};

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpListener, TcpStream};
use tokio_modbus::{
    prelude::*,
    server::tcp::{accept_tcp_connection, Server},
};

use crate::datastore::{Access, DatastoreError, DeviceDatastore, RegisterClass};
use crate::utility::ShutdownSignal;

/// Largest quantity of bits one read request may ask for.
pub const MAX_READ_BITS: u16 = 2000;
/// Largest quantity of registers one read request may ask for.
pub const MAX_READ_REGISTERS: u16 = 125;

impl From<DatastoreError> for ExceptionCode {
    fn from(err: DatastoreError) -> Self {
        match err {
            DatastoreError::InvalidAddress { .. } => ExceptionCode::IllegalDataAddress,
            DatastoreError::ReadOnlyViolation { .. } => ExceptionCode::IllegalFunction,
            DatastoreError::InvalidValue { .. } => ExceptionCode::IllegalDataValue,
        }
    }
}

/// Modbus service for one client connection.
#[derive(Debug, Clone)]
pub struct DeviceModbusServer {
    datastore: DeviceDatastore,
}

impl DeviceModbusServer {
    pub fn new(datastore: DeviceDatastore) -> Self {
        Self { datastore }
    }

    fn read_bits(&self, class: RegisterClass, addr: u16, cnt: u16) -> Result<Vec<bool>, ExceptionCode> {
        debug!("Reading {} {}(s) starting from address {}", cnt, class, addr);
        check_quantity(cnt, MAX_READ_BITS)?;
        Ok(self.datastore.read_bits(class, addr, cnt.into())?)
    }

    fn read_words(&self, class: RegisterClass, addr: u16, cnt: u16) -> Result<Vec<u16>, ExceptionCode> {
        debug!("Reading {} {}(s) starting from address {}", cnt, class, addr);
        check_quantity(cnt, MAX_READ_REGISTERS)?;
        Ok(self.datastore.read(class, addr, cnt.into())?)
    }

    fn write_bits(&self, addr: u16, values: &[bool]) -> Result<(), ExceptionCode> {
        debug!("Writing {} coil(s) starting from address {}", values.len(), addr);
        if values.is_empty() {
            return Err(ExceptionCode::IllegalDataValue);
        }
        Ok(self
            .datastore
            .write_bits(RegisterClass::Coil, addr, values, Access::Network)?)
    }

    fn write_words(&self, addr: u16, values: &[u16]) -> Result<(), ExceptionCode> {
        debug!(
            "Writing {} value(s) to holding registers starting from address {}",
            values.len(),
            addr
        );
        if values.is_empty() {
            return Err(ExceptionCode::IllegalDataValue);
        }
        Ok(self
            .datastore
            .write(RegisterClass::HoldingRegister, addr, values, Access::Network)?)
    }
}

fn check_quantity(cnt: u16, max: u16) -> Result<(), ExceptionCode> {
    if cnt == 0 || cnt > max {
        error!("Exception::IllegalDataValue - quantity {} outside 1..={}", cnt, max);
        return Err(ExceptionCode::IllegalDataValue);
    }
    Ok(())
}

impl tokio_modbus::server::Service for DeviceModbusServer {
    type Request = Request<'static>;
    type Response = Response;
    type Exception = ExceptionCode;
    type Future = future::Ready<Result<Self::Response, Self::Exception>>;

    /// Process a Modbus request and provide a response
    ///
    /// Handled function codes: 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x0F and 0x10.
    /// Any other function code will return an IllegalFunction exception.
    fn call(&self, req: Self::Request) -> Self::Future {
        debug!("Received Modbus request: {:?}", req);

        let res = match req {
            Request::ReadCoils(addr, cnt) => self
                .read_bits(RegisterClass::Coil, addr, cnt)
                .map(Response::ReadCoils),
            Request::ReadDiscreteInputs(addr, cnt) => self
                .read_bits(RegisterClass::DiscreteInput, addr, cnt)
                .map(Response::ReadDiscreteInputs),
            Request::ReadHoldingRegisters(addr, cnt) => self
                .read_words(RegisterClass::HoldingRegister, addr, cnt)
                .map(Response::ReadHoldingRegisters),
            Request::ReadInputRegisters(addr, cnt) => self
                .read_words(RegisterClass::InputRegister, addr, cnt)
                .map(Response::ReadInputRegisters),
            Request::WriteSingleCoil(addr, value) => self
                .write_bits(addr, std::slice::from_ref(&value))
                .map(|_| Response::WriteSingleCoil(addr, value)),
            Request::WriteSingleRegister(addr, value) => self
                .write_words(addr, std::slice::from_ref(&value))
                .map(|_| Response::WriteSingleRegister(addr, value)),
            Request::WriteMultipleCoils(addr, values) => self
                .write_bits(addr, &values)
                .map(|_| Response::WriteMultipleCoils(addr, values.len() as u16)),
            Request::WriteMultipleRegisters(addr, values) => self
                .write_words(addr, &values)
                .map(|_| Response::WriteMultipleRegisters(addr, values.len() as u16)),
            _ => {
                error!(
                    "Exception::IllegalFunction - Unimplemented function code in request: {req:?}"
                );
                Err(ExceptionCode::IllegalFunction)
            }
        };

        if let Err(e) = &res {
            error!("Modbus request error: {:?}", e);
        }

        future::ready(res)
    }
}

/// Bind the Modbus listener.
///
/// Port 0 lets the OS choose; read the result back with
/// [`TcpListener::local_addr`].
pub async fn bind(address: &str, port: u16) -> Result<TcpListener> {
    let socket_addr: SocketAddr = format!("{}:{}", address, port)
        .parse()
        .with_context(|| format!("Invalid Modbus socket address {}:{}", address, port))?;
    TcpListener::bind(socket_addr)
        .await
        .with_context(|| format!("Cannot bind Modbus server to {}", socket_addr))
}

/// Client stream that reads as closed once shutdown is requested.
///
/// The connection loop then sees end of input, drops the stream and the
/// client is disconnected. Requests still buffered are never executed.
pub struct ShutdownStream<T> {
    inner: T,
    stop: Pin<Box<dyn Future<Output = ()> + Send>>,
    stopped: bool,
}

impl<T> ShutdownStream<T> {
    pub fn new(inner: T, mut shutdown: ShutdownSignal) -> Self {
        Self {
            inner,
            stop: Box::pin(async move { shutdown.wait().await }),
            stopped: false,
        }
    }
}

impl<T: AsyncRead + Unpin> AsyncRead for ShutdownStream<T> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut TaskContext<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if !self.stopped && self.stop.as_mut().poll(cx).is_ready() {
            self.stopped = true;
        }
        if self.stopped {
            // Nothing filled: end of stream
            return Poll::Ready(Ok(()));
        }
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl<T: AsyncWrite + Unpin> AsyncWrite for ShutdownStream<T> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut TaskContext<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

/// Accept connections on `listener`, one service per connection.
///
/// Once `shutdown` fires, new clients are refused and every open connection
/// is closed before its next request. The accept loop itself only returns on
/// a listener failure; cancel it by aborting its task.
pub async fn serve(
    listener: TcpListener,
    datastore: DeviceDatastore,
    shutdown: ShutdownSignal,
) -> Result<()> {
    if let Ok(local) = listener.local_addr() {
        info!("Modbus server listening on {}", local);
    }
    let server = Server::new(listener);

    let on_connected = move |stream: TcpStream, socket_addr: SocketAddr| {
        let datastore = datastore.clone();
        let shutdown = shutdown.clone();
        async move {
            if shutdown.is_triggered() {
                info!("Refusing Modbus client {} during shutdown", socket_addr);
                return io::Result::Ok(None);
            }
            info!("Modbus client connected from {}", socket_addr);
            let accepted = accept_tcp_connection(stream, socket_addr, |_socket_addr| {
                Ok(Some(DeviceModbusServer::new(datastore.clone())))
            })?;
            Ok(accepted.map(|(service, stream)| (service, ShutdownStream::new(stream, shutdown))))
        }
    };

    let on_process_error = |err| {
        warn!("Modbus connection error: {err}");
    };

    server
        .serve(&on_connected, on_process_error)
        .await
        .context("Modbus server stopped")
}
